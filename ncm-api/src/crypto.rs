//! Request encryption for the three Netease API schemes.
//!
//! - **weapi**: JSON → AES-CBC(preset key) → base64 → AES-CBC(random key) →
//!   base64 = `params`; RSA: `reverse(random_key)` → zero-pad to 128 bytes →
//!   `modpow(e, n)` → hex = `encSecKey`
//! - **eapi**: `"{path}-36cd479b6b5-{json}-36cd479b6b5-{md5}"` →
//!   AES-ECB(eapi key) → upper hex = `params`
//! - **linuxapi**: `{"method","url","params"}` JSON → AES-ECB(linux key) →
//!   upper hex = `eparams`

use crate::error::{NeteaseError, Result};
use aes::Aes128;
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest, Md5};
use num_bigint::BigUint;
use rand::Rng;

const IV: &[u8; 16] = b"0102030405060708";
const PRESET_KEY: &[u8; 16] = b"0CoJUm6Qyw8W8jud";
const EAPI_KEY: &[u8; 16] = b"e82ckenh8dichen8";
const LINUXAPI_KEY: &[u8; 16] = b"rFgB&h#%2?^eDg:Q";

// RSA-1024 public key extracted from Netease web client
const RSA_MODULUS_HEX: &str = "\
    e0b509f6259df8642dbc35662901477df22677ec152b5ff68ace615bb7b72515\
    2b3ab17a876aea8a5aa76d2e417629ec4ee341f56135fccf695280104e0312ec\
    bda92557c93870114af6c9d05c4f7f0c3685b7a46bee255932575cce10b424d\
    813cfe4875d3e82047b97ddef52741d546b8e289dc6935b3ece0462db0a22b8e7";
const RSA_EXPONENT: u32 = 65537;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128EcbEnc = ecb::Encryptor<Aes128>;
type Aes128EcbDec = ecb::Decryptor<Aes128>;

/// WEAPI encrypted payload.
pub struct WeapiPayload {
    /// `params` form field (base64).
    pub params: String,
    /// `encSecKey` form field (256 hex chars).
    pub enc_sec_key: String,
}

/// Encrypt `data` (JSON string) using the WEAPI scheme.
pub fn weapi_encrypt(data: &str) -> WeapiPayload {
    let secret_key = random_key();

    // First AES pass: encrypt with preset key
    let pass1 = aes_cbc_encrypt(data.as_bytes(), PRESET_KEY, IV);
    let pass1_b64 = B64.encode(&pass1);

    // Second AES pass: encrypt with random key
    let pass2 = aes_cbc_encrypt(pass1_b64.as_bytes(), &secret_key, IV);
    let params = B64.encode(&pass2);

    let enc_sec_key = rsa_encrypt(&secret_key);

    WeapiPayload { params, enc_sec_key }
}

/// Encrypt `data` (JSON string) for eapi, signing `path` (e.g. `/api/batch`).
///
/// Returns the upper-case hex value of the `params` form field.
pub fn eapi_encrypt(path: &str, data: &str) -> String {
    let message = format!("nobody{path}use{data}md5forencrypt");
    let digest = md5_hex(message.as_bytes());
    let plain = format!("{path}-36cd479b6b5-{data}-36cd479b6b5-{digest}");
    hex::encode_upper(aes_ecb_encrypt(plain.as_bytes(), EAPI_KEY))
}

/// Decrypt an encrypted eapi response body.
pub fn eapi_decrypt(data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = data.to_vec();
    Aes128EcbDec::new(EAPI_KEY.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map(<[u8]>::to_vec)
        .map_err(|e| NeteaseError::Crypto(e.to_string()))
}

/// Encrypt a linuxapi forward envelope (JSON string).
///
/// Returns the upper-case hex value of the `eparams` form field.
pub fn linuxapi_encrypt(data: &str) -> String {
    hex::encode_upper(aes_ecb_encrypt(data.as_bytes(), LINUXAPI_KEY))
}

/// Lower-case hex MD5, as used for login passwords and eapi digests.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// AES-128-CBC encrypt with PKCS7 padding.
fn aes_cbc_encrypt(plaintext: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Vec<u8> {
    let enc = Aes128CbcEnc::new(key.into(), iv.into());
    let mut buf = padded_buffer(plaintext);
    let ct = enc
        .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
        .expect("buffer is correctly sized");
    ct.to_vec()
}

/// AES-128-ECB encrypt with PKCS7 padding.
fn aes_ecb_encrypt(plaintext: &[u8], key: &[u8; 16]) -> Vec<u8> {
    let enc = Aes128EcbEnc::new(key.into());
    let mut buf = padded_buffer(plaintext);
    let ct = enc
        .encrypt_padded_mut::<Pkcs7>(&mut buf, plaintext.len())
        .expect("buffer is correctly sized");
    ct.to_vec()
}

/// Copy `plaintext` into a buffer with room for up to 16 bytes of padding.
fn padded_buffer(plaintext: &[u8]) -> Vec<u8> {
    let pad_len = 16 - (plaintext.len() % 16);
    let mut buf = vec![0u8; plaintext.len() + pad_len];
    buf[..plaintext.len()].copy_from_slice(plaintext);
    buf
}

/// RSA `NO_PADDING` encrypt: reverse key, zero-pad to 128 bytes, `modpow(e, n)`, hex output.
fn rsa_encrypt(key: &[u8; 16]) -> String {
    let mut reversed: Vec<u8> = key.iter().copied().rev().collect();

    // Zero-pad on the left to 128 bytes (1024 bits)
    let mut padded = vec![0u8; 128 - reversed.len()];
    padded.append(&mut reversed);

    let m = BigUint::from_bytes_be(&padded);
    let n = BigUint::parse_bytes(RSA_MODULUS_HEX.replace(' ', "").as_bytes(), 16)
        .expect("invalid RSA modulus");
    let e = BigUint::from(RSA_EXPONENT);

    let cipher = m.modpow(&e, &n);
    format!("{cipher:0>256x}")
}

/// Generate a random 16-byte alphanumeric key.
fn random_key() -> [u8; 16] {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    let mut key = [0u8; 16];
    for b in &mut key {
        *b = CHARSET[rng.random_range(0..CHARSET.len())];
    }
    key
}

/// Random lower-case hex string of `bytes` random bytes (device/nuid cookies).
pub fn random_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    let buf: Vec<u8> = (0..bytes).map(|_| rng.random()).collect();
    hex::encode(buf)
}
