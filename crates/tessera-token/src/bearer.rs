//! `Authorization: Bearer <token>` helpers.

/// Header carrying the token in both directions.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

const SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively. Returns `None` for other
/// schemes and for a blank token.
pub fn extract(header_value: &str) -> Option<&str> {
    let value = header_value.trim();
    let (scheme, rest) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Header value returned to the client after a successful login.
pub fn header_value(token: &str) -> String {
    format!("{} {}", SCHEME, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract() {
        assert_eq!(extract("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract("bearer   abc "), Some("abc"));
        assert_eq!(extract("Bearer "), None);
        assert_eq!(extract("Bearer"), None);
        assert_eq!(extract("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_header_value_round_trip() {
        let value = header_value("abc.def.ghi");
        assert_eq!(value, "Bearer abc.def.ghi");
        assert_eq!(extract(&value), Some("abc.def.ghi"));
    }
}
