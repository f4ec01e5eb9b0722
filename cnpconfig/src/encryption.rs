//! Chiffrement des mots de passe marchands stockés dans la configuration
//!
//! Un mot de passe peut être écrit en clair ou sous la forme
//! `encrypted:BASE64`. La clé AES-256-GCM est dérivée d'un identifiant de la
//! machine (`/etc/machine-id` sous Linux, `IOPlatformUUID` sous macOS), ou de
//! la variable `CNPGATEWAY_MACHINE_KEY` quand elle est définie (conteneurs,
//! CI). Le fichier chiffré n'est donc pas portable d'une machine à l'autre.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Result, anyhow};
use base64::Engine;
use sha2::{Digest, Sha256};

/// Préfixe pour identifier les mots de passe chiffrés
const ENCRYPTED_PREFIX: &str = "encrypted:";

const ENV_MACHINE_KEY: &str = "CNPGATEWAY_MACHINE_KEY";
const KEY_SALT: &[u8] = b"cnpgateway-password-key-v1";
const NONCE_SALT: &[u8] = b"cnpgateway-password-nonce-v1";
const NONCE_LEN: usize = 12;

/// Identifiant stable de la machine, source de la clé de chiffrement
fn machine_identity() -> Result<String> {
    if let Ok(key) = std::env::var(ENV_MACHINE_KEY) {
        if !key.trim().is_empty() {
            return Ok(key);
        }
    }

    #[cfg(target_os = "macos")]
    {
        let output = std::process::Command::new("ioreg")
            .args(["-d2", "-c", "IOPlatformExpertDevice"])
            .output()?;
        let output_str = String::from_utf8_lossy(&output.stdout);

        // Format: "IOPlatformUUID" = "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX"
        output_str
            .lines()
            .find(|line| line.contains("IOPlatformUUID"))
            .and_then(|line| line.split('"').nth(3))
            .map(str::to_string)
            .ok_or_else(|| anyhow!("Failed to extract IOPlatformUUID from ioreg"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        ["/etc/machine-id", "/var/lib/dbus/machine-id"]
            .iter()
            .filter_map(|path| std::fs::read_to_string(path).ok())
            .map(|id| id.trim().to_string())
            .find(|id| !id.is_empty())
            .ok_or_else(|| anyhow!("No machine id available, set {}", ENV_MACHINE_KEY))
    }
}

fn derive_key(identity: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(KEY_SALT);
    hasher.finalize().into()
}

fn cipher_for(identity: &str) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&derive_key(identity))
        .map_err(|e| anyhow!("Failed to create cipher: {}", e))
}

// Nonce dérivé du mot de passe : même mot de passe, même texte chiffré,
// le fichier de configuration ne change pas à chaque sauvegarde.
fn encrypt_with_identity(password: &str, identity: &str) -> Result<String> {
    let cipher = cipher_for(identity)?;

    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(NONCE_SALT);
    let digest = hasher.finalize();
    let nonce_bytes = &digest[..NONCE_LEN];

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce_bytes), password.as_bytes())
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    // nonce(12 bytes) + ciphertext
    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(format!(
        "{}{}",
        ENCRYPTED_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&combined)
    ))
}

fn decrypt_with_identity(encrypted: &str, identity: &str) -> Result<String> {
    let base64_data = encrypted
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| anyhow!("Invalid encrypted password format (missing prefix)"))?;

    let combined = base64::engine::general_purpose::STANDARD
        .decode(base64_data)
        .map_err(|e| anyhow!("Invalid base64: {}", e))?;

    if combined.len() <= NONCE_LEN {
        return Err(anyhow!("Invalid ciphertext (too short)"));
    }
    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);

    let plaintext = cipher_for(identity)?
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| anyhow!("Decryption failed (wrong machine or corrupted data): {}", e))?;

    String::from_utf8(plaintext).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Chiffre un mot de passe avec la clé de la machine
///
/// Retourne une valeur `encrypted:BASE64` à coller dans `config.yaml`.
pub fn encrypt_password(password: &str) -> Result<String> {
    encrypt_with_identity(password, &machine_identity()?)
}

/// Déchiffre une valeur `encrypted:BASE64`
///
/// # Errors
///
/// Retourne une erreur si le format est invalide ou si la valeur a été
/// chiffrée sur une autre machine.
pub fn decrypt_password(encrypted: &str) -> Result<String> {
    decrypt_with_identity(encrypted, &machine_identity()?)
}

/// Vérifie si une valeur est un mot de passe chiffré
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Obtient le mot de passe en clair, qu'il soit chiffré ou non
pub fn get_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        decrypt_password(value)
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f0";

    #[test]
    fn test_encrypt_decrypt() {
        let encrypted = encrypt_with_identity("SuperSecret123!", IDENTITY).unwrap();
        assert!(encrypted.starts_with(ENCRYPTED_PREFIX));
        assert!(!encrypted.contains("SuperSecret123!"));

        let decrypted = decrypt_with_identity(&encrypted, IDENTITY).unwrap();
        assert_eq!(decrypted, "SuperSecret123!");
    }

    #[test]
    fn test_encryption_is_deterministic() {
        let first = encrypt_with_identity("secret", IDENTITY).unwrap();
        let second = encrypt_with_identity("secret", IDENTITY).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_other_machine_cannot_decrypt() {
        let encrypted = encrypt_with_identity("secret", IDENTITY).unwrap();
        assert!(decrypt_with_identity(&encrypted, "another-machine").is_err());
    }

    #[test]
    fn test_invalid_payloads() {
        assert!(decrypt_with_identity("secret", IDENTITY).is_err());
        assert!(decrypt_with_identity("encrypted:!!!", IDENTITY).is_err());
        assert!(decrypt_with_identity("encrypted:AAAA", IDENTITY).is_err());
    }

    #[test]
    fn test_is_encrypted() {
        assert!(is_encrypted("encrypted:SGVsbG8="));
        assert!(!is_encrypted("plaintext"));
        assert!(!is_encrypted(""));
    }

    #[test]
    fn test_get_password_plaintext() {
        assert_eq!(get_password("plaintext").unwrap(), "plaintext");
    }
}
