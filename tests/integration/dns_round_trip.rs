//! The encoded query name for `facebook.com` matches the literal label
//! sequence, and a crafted response carrying one A record resolves to
//! the expected address.

use dns_codec::{build_query, decode_response, DnsAddress, QType};

#[test]
fn facebook_com_encodes_to_the_literal_label_sequence() {
    let query = build_query(0x1234, "facebook.com", QType::A).unwrap();

    let expected_name: &[u8] = b"\x09facebook\x03com\x00";
    // Header is 12 bytes; the encoded name immediately follows.
    assert_eq!(&query[12..12 + expected_name.len()], expected_name);
}

#[test]
fn single_a_record_response_yields_the_expected_address() {
    let id = 0x1234;
    let query = build_query(id, "facebook.com", QType::A).unwrap();
    let question_len = query.len() - 12 - 4; // minus header, minus QTYPE+QCLASS

    let mut response = Vec::new();
    response.extend_from_slice(&id.to_be_bytes());
    response.extend_from_slice(&0x8180u16.to_be_bytes()); // QR=1, RD=1, RA=1, RCODE=0
    response.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    response.extend_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    response.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    response.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT
    response.extend_from_slice(&query[12..12 + question_len + 4]); // question section, verbatim

    response.extend_from_slice(b"\xc0\x0c"); // name: pointer back to the question
    response.extend_from_slice(&1u16.to_be_bytes()); // TYPE A
    response.extend_from_slice(&1u16.to_be_bytes()); // CLASS IN
    response.extend_from_slice(&300u32.to_be_bytes()); // TTL
    response.extend_from_slice(&4u16.to_be_bytes()); // RDLENGTH
    response.extend_from_slice(&[1, 2, 3, 4]); // RDATA

    let addresses = decode_response(&response, id, QType::A).unwrap();
    assert_eq!(addresses, vec![DnsAddress::V4("1.2.3.4".parse().unwrap())]);
}
