#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub enum DnsCodecError {
    #[error("hostname label longer than 63 bytes")]
    LabelTooLong,
    #[error("encoded query name longer than 255 bytes")]
    NameTooLong,
    #[error("query buffer too small")]
    QueryBufferTooSmall,
    #[error("datagram shorter than a DNS header")]
    TruncatedHeader,
    #[error("read past the end of the datagram")]
    OutOfBounds,
    #[error("label pointer compression exceeded the hop limit")]
    TooManyPointerHops,
    #[error("label pointer did not point strictly backwards")]
    BadPointerTarget,
    #[error("resource record claims an rdlength that overruns the datagram")]
    RdataOverrun,
    #[error("query id in the response does not match the request")]
    IdMismatch,
    #[error("server returned a non-zero RCODE")]
    ServerError(u8),
    #[error("no address record of the requested type was present")]
    NoAddressRecord,
}
