//! Cryptographic primitives for Vaulted.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)
//! - HKDF sub-keys and the stored password verifier (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, decrypt_field, encrypt, encrypt_field};
pub use kdf::{derive_master_key, generate_salt, Argon2Params};
pub use keys::MasterKey;
