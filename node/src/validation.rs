//! Request-shape checks applied at the boundary, before a pipeline runs.
//!
//! The HTTP handlers and the one-shot CLI commands share these so a request
//! is accepted or rejected the same way on both surfaces.

use ayllu_protocol::{RegistrationRequest, TransferRequest};

/// Minimum payload length after the `addr1` / `addr_test1` prefix.
const MIN_ADDRESS_PAYLOAD: usize = 58;

/// Reason a request was turned away. The display text is returned to the
/// caller as the error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    AmountOutOfRange { max: u64 },
    MalformedAddress,
    IncompleteRegistration,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::AmountOutOfRange { max } => {
                write!(f, "requested reward amount must be between 1 and {max}")
            }
            Rejection::MalformedAddress => f.write_str("malformed receiver address"),
            Rejection::IncompleteRegistration => f.write_str("incomplete registration data"),
        }
    }
}

/// Shelley-style bech32 address: `addr1` or `addr_test1` followed by at
/// least 58 alphanumerics. Case-insensitive.
pub fn is_valid_address(address: &str) -> bool {
    let lowered = address.to_ascii_lowercase();
    let payload = lowered
        .strip_prefix("addr_test1")
        .or_else(|| lowered.strip_prefix("addr1"));

    match payload {
        Some(rest) => {
            rest.len() >= MIN_ADDRESS_PAYLOAD
                && rest
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        }
        None => false,
    }
}

pub fn check_claim(request: &TransferRequest, max_amount: u64) -> Result<(), Rejection> {
    if request.amount == 0 || request.amount > max_amount {
        return Err(Rejection::AmountOutOfRange { max: max_amount });
    }
    if !is_valid_address(&request.receiver_address) {
        return Err(Rejection::MalformedAddress);
    }
    Ok(())
}

pub fn check_registration(request: &RegistrationRequest) -> Result<(), Rejection> {
    let blank = [
        &request.student_address,
        &request.student_pkh,
        &request.tx_hash,
    ]
    .iter()
    .any(|field| field.trim().is_empty());

    if blank {
        return Err(Rejection::IncompleteRegistration);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ayllu_contracts::RegistrationAction;

    pub(crate) fn testnet_address() -> String {
        format!("addr_test1{}", "q".repeat(58))
    }

    #[test]
    fn accepts_testnet_and_mainnet_addresses() {
        assert!(is_valid_address(&testnet_address()));
        assert!(is_valid_address(&format!("addr1{}", "x9".repeat(29))));
        assert!(is_valid_address(&format!("ADDR_TEST1{}", "Q".repeat(60))));
    }

    #[test]
    fn rejects_short_or_foreign_addresses() {
        assert!(!is_valid_address(&format!("addr_test1{}", "q".repeat(57))));
        assert!(!is_valid_address(&format!("stake1{}", "q".repeat(58))));
        assert!(!is_valid_address(&format!("addr_test1{}_", "q".repeat(58))));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn claim_amount_bounds_are_inclusive() {
        let address = testnet_address();
        assert!(check_claim(&TransferRequest::new(&address, 1), 10).is_ok());
        assert!(check_claim(&TransferRequest::new(&address, 10), 10).is_ok());
        assert_eq!(
            check_claim(&TransferRequest::new(&address, 0), 10),
            Err(Rejection::AmountOutOfRange { max: 10 })
        );
        assert_eq!(
            check_claim(&TransferRequest::new(&address, 11), 10),
            Err(Rejection::AmountOutOfRange { max: 10 })
        );
    }

    #[test]
    fn amount_is_checked_before_address() {
        assert_eq!(
            check_claim(&TransferRequest::new("nope", 0), 10),
            Err(Rejection::AmountOutOfRange { max: 10 })
        );
        assert_eq!(
            check_claim(&TransferRequest::new("nope", 1), 10),
            Err(Rejection::MalformedAddress)
        );
    }

    #[test]
    fn registration_requires_every_text_field() {
        let mut request = RegistrationRequest {
            student_address: testnet_address(),
            student_pkh: "ab".repeat(28),
            tx_hash: "cd".repeat(32),
            output_index: 0,
            action: RegistrationAction::Register,
        };
        assert!(check_registration(&request).is_ok());

        request.tx_hash = "   ".into();
        assert_eq!(
            check_registration(&request),
            Err(Rejection::IncompleteRegistration)
        );
    }
}
