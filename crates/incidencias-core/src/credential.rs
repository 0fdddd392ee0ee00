//! Stored password credentials.
//!
//! A stored password is classified once, by its format marker, into a
//! [`Credential`]. Accounts created here always get an argon2id PHC string.
//! bcrypt strings (written by the old seed script) and plaintext values
//! (accounts from before hashing was introduced) still authenticate.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Length of a bcrypt modular-crypt string, e.g. `$2b$10$` + 53 chars.
const BCRYPT_LEN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
  /// PHC string, `$argon2id$v=19$...`
  Argon2,
  /// Modular crypt, `$2a$`, `$2b$`, `$2x$` or `$2y$`.
  Bcrypt,
}

/// A stored password, tagged by how it must be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
  /// Legacy value stored as-is.
  Plaintext(&'a str),
  Hashed {
    scheme:  HashScheme,
    encoded: &'a str,
  },
}

impl<'a> Credential<'a> {
  /// Decide how `stored` must be verified.
  ///
  /// A value only counts as hashed when it is well-formed for its scheme;
  /// anything else is treated as legacy plaintext.
  pub fn classify(stored: &'a str) -> Self {
    if is_bcrypt(stored) {
      return Credential::Hashed { scheme: HashScheme::Bcrypt, encoded: stored };
    }
    if stored.starts_with("$argon2") && PasswordHash::new(stored).is_ok() {
      return Credential::Hashed { scheme: HashScheme::Argon2, encoded: stored };
    }
    Credential::Plaintext(stored)
  }

  /// Check `candidate` against this credential.
  pub fn verify(&self, candidate: &str) -> bool {
    match *self {
      Credential::Plaintext(stored) => stored == candidate,
      Credential::Hashed { scheme: HashScheme::Argon2, encoded } => {
        PasswordHash::new(encoded)
          .map(|hash| {
            Argon2::default()
              .verify_password(candidate.as_bytes(), &hash)
              .is_ok()
          })
          .unwrap_or(false)
      }
      Credential::Hashed { scheme: HashScheme::Bcrypt, encoded } => {
        bcrypt::verify(candidate, encoded).unwrap_or(false)
      }
    }
  }

  pub fn is_hashed(&self) -> bool { matches!(self, Credential::Hashed { .. }) }
}

fn is_bcrypt(s: &str) -> bool {
  let b = s.as_bytes();
  b.len() == BCRYPT_LEN
    && b[0] == b'$'
    && b[1] == b'2'
    && matches!(b[2], b'a' | b'b' | b'x' | b'y')
    && b[3] == b'$'
}

/// Hash `password` into the argon2id PHC string stored for new accounts.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Hash(e.to_string()))
}
