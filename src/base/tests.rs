use crate::base::neterror::{ErrorKind, NetError};

#[test]
fn test_kind_mapping_covers_taxonomy() {
    assert_eq!(
        NetError::UnknownProfile("nope".into()).kind(),
        ErrorKind::UnknownProfile
    );
    assert_eq!(
        NetError::SslPinnedKeyNotInCertChain("example.com".into()).kind(),
        ErrorKind::ConnectionFailed
    );
    assert_eq!(
        NetError::ProxyConnectionFailed("refused".into()).kind(),
        ErrorKind::ConnectionFailed
    );
    assert_eq!(NetError::TimedOut(1500).kind(), ErrorKind::Timeout);
    assert_eq!(
        NetError::MethodNotSupported("TRACE".into()).kind(),
        ErrorKind::InvalidPayload
    );
}

#[test]
fn test_codes_are_negative_and_distinct() {
    let errors = [
        NetError::ConnectionClosed,
        NetError::TimedOut(1),
        NetError::TooManyRedirects(10),
        NetError::InvalidPayload(String::new()),
        NetError::UnknownProfile(String::new()),
        NetError::InvalidProfile(String::new()),
        NetError::HandleNotFound(String::new()),
    ];
    let mut codes: Vec<i32> = errors.iter().map(NetError::as_i32).collect();
    assert!(codes.iter().all(|c| *c < 0));
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());
}

#[test]
fn test_pin_error_message() {
    let err = NetError::SslPinnedKeyNotInCertChain("example.com".into());
    assert!(err.to_string().contains("bad ssl pin detected"));
}
