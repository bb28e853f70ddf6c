//! Integration tests for the PassVault crypto module.

use passvault::crypto::{
    decrypt_field, derive_key, encrypt_field, generate_salt, Envelope, SymmetricKey, IV_LEN,
    KEY_LEN, SALT_LEN,
};
use passvault::errors::VaultError;

fn key(byte: u8) -> SymmetricKey {
    SymmetricKey::new([byte; KEY_LEN])
}

// ---------------------------------------------------------------------------
// Envelope round-trip
// ---------------------------------------------------------------------------

#[test]
fn roundtrip_for_assorted_plaintexts() {
    let k = key(0xAB);
    let samples = [
        "",
        "a",
        "hunter2",
        "contraseña con eñes y acentos: áéíóú",
        "emoji \u{1F510} and CJK \u{5BC6}\u{7801}",
        &"x".repeat(10_000),
    ];

    for plaintext in samples {
        let env = encrypt_field(plaintext, &k).expect("encrypt should succeed");
        assert_eq!(env.iv.len(), IV_LEN);
        // The ciphertext carries the 16-byte tag.
        assert_eq!(env.ciphertext.len(), plaintext.len() + 16);
        assert_eq!(decrypt_field(&env, &k).unwrap(), plaintext);
    }
}

#[test]
fn same_plaintext_encrypts_differently_each_time() {
    let k = key(0xCD);
    let a = encrypt_field("SECRET=hello", &k).unwrap();
    let b = encrypt_field("SECRET=hello", &k).unwrap();

    assert_ne!(a.iv, b.iv, "IVs must be fresh per call");
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_eq!(decrypt_field(&a, &k).unwrap(), "SECRET=hello");
    assert_eq!(decrypt_field(&b, &k).unwrap(), "SECRET=hello");
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn flipping_any_ciphertext_bit_fails_authentication() {
    let k = key(0x11);
    let env = encrypt_field("tamper me", &k).unwrap();

    for byte in 0..env.ciphertext.len() {
        for bit in [0u8, 3, 7] {
            let mut bad = env.clone();
            bad.ciphertext[byte] ^= 1 << bit;
            assert!(matches!(
                decrypt_field(&bad, &k),
                Err(VaultError::Authentication)
            ));
        }
    }
}

#[test]
fn flipping_any_iv_bit_fails_authentication() {
    let k = key(0x22);
    let env = encrypt_field("tamper me", &k).unwrap();

    for byte in 0..IV_LEN {
        let mut bad = env.clone();
        bad.iv[byte] ^= 0x80;
        assert!(matches!(
            decrypt_field(&bad, &k),
            Err(VaultError::Authentication)
        ));
    }
}

#[test]
fn wrong_key_fails_authentication() {
    let env = encrypt_field("secret", &key(1)).unwrap();
    assert!(matches!(
        decrypt_field(&env, &key(2)),
        Err(VaultError::Authentication)
    ));
}

#[test]
fn malformed_iv_length_fails_authentication() {
    let k = key(3);
    let mut env = encrypt_field("secret", &k).unwrap();
    env.iv.push(0);
    assert!(matches!(
        decrypt_field(&env, &k),
        Err(VaultError::Authentication)
    ));
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

#[test]
fn envelope_serializes_as_base64_iv_and_ciphertext() {
    let env = encrypt_field("x", &key(4)).unwrap();
    let json = serde_json::to_value(&env).unwrap();

    let obj = json.as_object().expect("envelope is a JSON object");
    assert_eq!(obj.len(), 2);
    assert!(obj["iv"].is_string());
    assert!(obj["ciphertext"].is_string());

    let back: Envelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, env);
    assert_eq!(decrypt_field(&back, &key(4)).unwrap(), "x");
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

#[test]
fn derived_keys_agree_for_same_inputs_and_differ_otherwise() {
    let salt = generate_salt();
    assert_eq!(salt.len(), SALT_LEN);

    let k1 = derive_key("correct horse battery staple", &salt);
    let k2 = derive_key("correct horse battery staple", &salt);
    let other_pass = derive_key("correct horse battery stapleX", &salt);
    let other_salt = derive_key("correct horse battery staple", &generate_salt());

    let env = encrypt_field("probe", &k1).unwrap();
    assert_eq!(decrypt_field(&env, &k2).unwrap(), "probe");
    assert!(decrypt_field(&env, &other_pass).is_err());
    assert!(decrypt_field(&env, &other_salt).is_err());
}

#[test]
fn empty_and_multibyte_passphrases_derive() {
    let salt = [7u8; SALT_LEN];
    let empty = derive_key("", &salt);
    let accented = derive_key("señor-pässwörd", &salt);

    let env = encrypt_field("probe", &empty).unwrap();
    assert!(decrypt_field(&env, &accented).is_err());
    assert_eq!(decrypt_field(&env, &empty).unwrap(), "probe");
}
