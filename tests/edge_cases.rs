mod common;

use std::io::Cursor;
use std::time::{Duration, UNIX_EPOCH};

use common::{decrypt_to_vec, encrypt_to_vec, split_container, TestNetwork, TEST_CHAIN_HEX};
use group::Group;
use sha2::{Digest, Sha256};

use tlock::armor;
use tlock::beacon::{round_identity, ChainInfo};
use tlock::errors::Error;
use tlock::header::Header;

fn parse(bytes: &[u8]) -> Result<(Header, [u8; 32]), Error> {
    Header::parse(&mut Cursor::new(bytes.to_vec()))
}

const BOGUS_MAC: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[test]
fn parse_surfaces_round_and_chain_without_network() {
    let network = TestNetwork::new(123);
    let container = encrypt_to_vec(&network, 123, b"peek");

    let (header, _mac) = parse(&container).expect("parse");
    assert_eq!(header.round, 123);
    assert_eq!(hex::encode(header.chain_hash), TEST_CHAIN_HEX);
}

#[test]
fn foreign_recipient_is_rejected() {
    let text = format!(
        "age-encryption.org/v1\n-> X25519 SVrzdFfkPxf0LPHOUGB1gNb9E5Vr8EpDgUcci0kPqNw\nEmECAEHKM7FW+6MMRz9VLjUt8ws56m2FJbeeXVtrTkNv\n--- {BOGUS_MAC}\n"
    );
    let res = parse(text.as_bytes());
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn disagreeing_tlock_stanzas_are_rejected() {
    let network = TestNetwork::new(150);
    let container = encrypt_to_vec(&network, 150, b"two voices");
    let (header_text, _) = split_container(&container);
    let lines: Vec<&str> = header_text.lines().collect();
    let intro = lines[1];
    let body = lines[2..lines.len() - 1].join("\n");

    let forged_intro = intro.replacen("tlock 150", "tlock 151", 1);
    let forged = format!(
        "{}\n{intro}\n{body}\n{forged_intro}\n{body}\n--- {BOGUS_MAC}\n",
        lines[0]
    );
    let res = parse(forged.as_bytes());
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn agreeing_duplicate_stanzas_parse() {
    let network = TestNetwork::new(150);
    let container = encrypt_to_vec(&network, 150, b"echo");
    let (header_text, _) = split_container(&container);
    let lines: Vec<&str> = header_text.lines().collect();
    let intro = lines[1];
    let body = lines[2..lines.len() - 1].join("\n");

    let forged = format!("{}\n{intro}\n{body}\n{intro}\n{body}\n--- {BOGUS_MAC}\n", lines[0]);
    let (header, _mac) = parse(forged.as_bytes()).expect("parse");
    assert_eq!(header.round, 150);
}

#[test]
fn unwrapped_stanza_body_is_accepted_end_to_end() {
    let network = TestNetwork::new(150);
    let container = encrypt_to_vec(&network, 150, b"one long line");
    let (header_text, payload) = split_container(&container);
    let lines: Vec<&str> = header_text.lines().collect();

    // Collapse the wrapped body lines into a single long one.
    let body = lines[2..lines.len() - 1].concat();
    let mac_line = lines[lines.len() - 1];
    let mut unwrapped = format!("{}\n{}\n{body}\n{mac_line}\n", lines[0], lines[1]).into_bytes();
    unwrapped.extend_from_slice(&payload);

    let plain = decrypt_to_vec(&network, &unwrapped).expect("decrypt");
    assert_eq!(plain, b"one long line");
}

#[test]
fn uppercase_chain_hex_is_rejected() {
    let chain = TEST_CHAIN_HEX.to_uppercase();
    let text = format!("age-encryption.org/v1\n-> tlock 100 {chain}\nAAAA\n--- {BOGUS_MAC}\n");
    let res = parse(text.as_bytes());
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn beacon_name_in_chain_argument_is_rejected() {
    let text = format!("age-encryption.org/v1\n-> tlock 100 mainnet\nAAAA\n--- {BOGUS_MAC}\n");
    let res = parse(text.as_bytes());
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn missing_mac_is_rejected() {
    let network = TestNetwork::new(150);
    let container = encrypt_to_vec(&network, 150, b"no mac");
    let (header_text, _) = split_container(&container);
    let without_mac = header_text
        .lines()
        .take_while(|line| !line.starts_with("--- "))
        .map(|line| format!("{line}\n"))
        .collect::<String>();

    let res = parse(without_mac.as_bytes());
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn oversized_stanza_body_is_rejected() {
    let network = TestNetwork::new(150);
    let container = encrypt_to_vec(&network, 150, b"big");
    let (header_text, _) = split_container(&container);
    let lines: Vec<&str> = header_text.lines().collect();

    let mut forged = format!("{}\n{}\n", lines[0], lines[1]);
    let filler = "A".repeat(64);
    for _ in 0..17000 {
        forged.push_str(&filler);
        forged.push('\n');
    }
    forged.push_str(&format!("--- {BOGUS_MAC}\n"));

    let res = parse(forged.as_bytes());
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn crlf_header_is_rejected() {
    let network = TestNetwork::new(150);
    let container = encrypt_to_vec(&network, 150, b"strict");
    let (header_text, payload) = split_container(&container);
    let mut crlf = header_text.replace('\n', "\r\n").into_bytes();
    crlf.extend_from_slice(&payload);

    let res = decrypt_to_vec(&network, &crlf);
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn armor_rejects_bad_header_line() {
    let res = armor::unarmor(&mut Cursor::new(
        b"-----BEGIN PGP MESSAGE-----\nAAAA\n-----END PGP MESSAGE-----\n".to_vec(),
    ));
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn armor_rejects_truncated_block() {
    let res = armor::unarmor(&mut Cursor::new(
        b"-----BEGIN AGE ENCRYPTED FILE-----\nAAAA\n".to_vec(),
    ));
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn armor_rejects_data_after_footer() {
    let res = armor::unarmor(&mut Cursor::new(
        b"-----BEGIN AGE ENCRYPTED FILE-----\nAAAA\n-----END AGE ENCRYPTED FILE-----\ntrailing\n"
            .to_vec(),
    ));
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn armor_rejects_non_canonical_wrapping() {
    // A short line in the middle of the body is not canonical.
    let mut text = String::from("-----BEGIN AGE ENCRYPTED FILE-----\n");
    text.push_str("AAAA\n");
    text.push_str(&"A".repeat(64));
    text.push('\n');
    text.push_str("-----END AGE ENCRYPTED FILE-----\n");

    let res = armor::unarmor(&mut Cursor::new(text.into_bytes()));
    assert!(matches!(res, Err(Error::InvalidContainer(_))));
}

#[test]
fn round_identity_is_sha256_of_big_endian_round() {
    let expected: [u8; 32] = Sha256::digest(1234u64.to_be_bytes()).into();
    assert_eq!(round_identity(1234), expected);
}

#[test]
fn round_at_follows_genesis_and_period() {
    let info = ChainInfo {
        public_key: blstrs::G2Projective::generator(),
        period_secs: 30,
        genesis_time: 1000,
        chain_hash: [0u8; 32],
        scheme_id: "pedersen-bls-unchained".into(),
    };
    let at = |secs: u64| info.round_at(UNIX_EPOCH + Duration::from_secs(secs));
    assert_eq!(at(1000), 1);
    assert_eq!(at(1029), 1);
    assert_eq!(at(1030), 2);
    assert_eq!(at(500), 1); // before genesis
}

#[test]
fn chained_scheme_is_rejected() {
    let info = ChainInfo {
        public_key: blstrs::G2Projective::generator(),
        period_secs: 30,
        genesis_time: 1000,
        chain_hash: [0u8; 32],
        scheme_id: "pedersen-bls-chained".into(),
    };
    assert!(matches!(info.validate(), Err(Error::NotUnchained)));
}
