//! Close status codes defined in RFC 6455 section 7.4.

/// Normal closure (1000). The purpose for the connection has been fulfilled.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Going away (1001). Server shutdown or browser navigation.
pub const GOING_AWAY: u16 = 1001;
/// Protocol error (1002).
pub const PROTOCOL_ERROR: u16 = 1002;
/// Unsupported data (1003). The endpoint cannot accept this data type.
pub const UNSUPPORTED_DATA: u16 = 1003;
/// No status received (1005). Pseudo-code, never sent on the wire.
pub const NO_STATUS_RECEIVED: u16 = 1005;
/// Abnormal closure (1006). Pseudo-code, never sent on the wire.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Invalid frame payload data (1007), e.g. non-UTF-8 in a text message.
pub const INVALID_FRAME_PAYLOAD_DATA: u16 = 1007;
/// Policy violation (1008).
pub const POLICY_VIOLATION: u16 = 1008;
/// Message too big (1009).
pub const MESSAGE_TOO_BIG: u16 = 1009;
/// Mandatory extension missing (1010).
pub const MANDATORY_EXTENSION: u16 = 1010;
/// Internal server error (1011).
pub const INTERNAL_SERVER_ERROR: u16 = 1011;
/// Service restart (1012).
pub const SERVICE_RESTART: u16 = 1012;
/// Try again later (1013).
pub const TRY_AGAIN_LATER: u16 = 1013;
/// TLS handshake failure (1015). Pseudo-code, never sent on the wire.
pub const TLS_HANDSHAKE: u16 = 1015;

/// Whether a close code received from the peer is acceptable.
///
/// The registered codes minus the pseudo-codes (1005, 1006, 1015), plus the
/// private range 3000..=4999. Anything else in a received Close frame is a
/// protocol error.
#[must_use]
pub fn is_valid_received_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1013) || matches!(code, 3000..=4999)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_codes_accepted() {
        for code in [1000, 1001, 1002, 1003, 1007, 1008, 1009, 1010, 1011, 1012, 1013] {
            assert!(is_valid_received_close_code(code), "code {code}");
        }
    }

    #[test]
    fn pseudo_codes_rejected() {
        for code in [NO_STATUS_RECEIVED, ABNORMAL_CLOSURE, TLS_HANDSHAKE] {
            assert!(!is_valid_received_close_code(code), "code {code}");
        }
    }

    #[test]
    fn private_range_accepted() {
        assert!(is_valid_received_close_code(3000));
        assert!(is_valid_received_close_code(4000));
        assert!(is_valid_received_close_code(4999));
    }

    #[test]
    fn out_of_range_rejected() {
        assert!(!is_valid_received_close_code(0));
        assert!(!is_valid_received_close_code(999));
        assert!(!is_valid_received_close_code(1004));
        assert!(!is_valid_received_close_code(1014));
        assert!(!is_valid_received_close_code(1016));
        assert!(!is_valid_received_close_code(2999));
        assert!(!is_valid_received_close_code(5000));
    }
}
