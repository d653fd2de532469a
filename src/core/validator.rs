use crate::domain::model::{
    CanonicalAddress, RejectionReason, GROUP_SUFFIX, INDIVIDUAL_SUFFIX, LEGACY_INDIVIDUAL_SUFFIX,
};
use crate::domain::ports::{Transport, TransportResult};

/// Raw input must be all digits or already carry an individual suffix.
pub fn check_syntax(raw: &str) -> Result<(), RejectionReason> {
    let all_digits = !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit());

    if all_digits || raw.ends_with(LEGACY_INDIVIDUAL_SUFFIX) || raw.ends_with(INDIVIDUAL_SUFFIX) {
        Ok(())
    } else {
        Err(RejectionReason::ContainsNonDigits)
    }
}

pub fn check_group_id(raw: &str) -> Result<(), RejectionReason> {
    if raw.ends_with(GROUP_SUFFIX) {
        Ok(())
    } else {
        Err(RejectionReason::InvalidGroupId)
    }
}

/// Asks the transport whether an account is registered at `address`.
pub async fn check_existence<T: Transport + ?Sized>(
    transport: &T,
    address: &str,
) -> TransportResult<Result<(), RejectionReason>> {
    let number_id = transport.get_number_id(address).await?;

    match number_id {
        Some(id) => {
            tracing::debug!("Number {} registered as {}", address, id.serialized);
            Ok(Ok(()))
        }
        None => Ok(Err(RejectionReason::UnregisteredNumber)),
    }
}

/// Validate a resolved destination against its raw input.
///
/// For individuals the existence check runs before the syntax check, so a
/// malformed number that is not registered reports `UnregisteredNumber`, and a
/// malformed number that does resolve reports `ContainsNonDigits`.
/// Group addresses are never looked up.
///
/// The outer `Result` carries transport failures, the inner one the verdict.
pub async fn validate<T: Transport + ?Sized>(
    transport: &T,
    address: &CanonicalAddress,
    raw: &str,
) -> TransportResult<Result<(), RejectionReason>> {
    match address {
        CanonicalAddress::Individual(canonical) => {
            if let Err(reason) = check_existence(transport, canonical).await? {
                return Ok(Err(reason));
            }
            Ok(check_syntax(raw))
        }
        CanonicalAddress::Group(_) => Ok(check_group_id(raw)),
    }
}
