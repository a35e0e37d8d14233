//! 凭据哈希集成测试
//!
//! 同一密钥两次哈希结果不同但都能验证；不同密钥互不验证

use flashdeck::auth::hasher::{CredentialHasher, HashAlgorithm};

fn hashers() -> Vec<CredentialHasher> {
    vec![
        CredentialHasher::new(HashAlgorithm::Argon2id {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap(),
        CredentialHasher::new(HashAlgorithm::Pbkdf2Sha256 { rounds: 1000 }).unwrap(),
    ]
}

const SECRETS: &[&str] = &[
    "a",
    "password123",
    "0123456789abcdef:Zm9vYmFyYmF6",
    "пароль с пробелами",
    "🔑🔑🔑",
];

#[test]
fn test_hash_is_salted_and_verifies() {
    for hasher in hashers() {
        for secret in SECRETS {
            let first = hasher.hash(secret.as_bytes()).unwrap();
            let second = hasher.hash(secret.as_bytes()).unwrap();

            assert_ne!(first, second, "salt must differ per call");
            assert!(hasher.verify(secret.as_bytes(), &first));
            assert!(hasher.verify(secret.as_bytes(), &second));
        }
    }
}

#[test]
fn test_distinct_secrets_do_not_verify() {
    for hasher in hashers() {
        for (i, s1) in SECRETS.iter().enumerate() {
            let record = hasher.hash(s1.as_bytes()).unwrap();
            for (j, s2) in SECRETS.iter().enumerate() {
                if i != j {
                    assert!(!hasher.verify(s2.as_bytes(), &record));
                }
            }
        }
    }
}

#[test]
fn test_records_verify_across_configured_algorithms() {
    let [argon, pbkdf] = <[CredentialHasher; 2]>::try_from(hashers()).ok().unwrap();

    let argon_record = argon.hash(b"secret").unwrap();
    let pbkdf_record = pbkdf.hash(b"secret").unwrap();

    // 记录自带算法与参数
    assert!(pbkdf.verify(b"secret", &argon_record));
    assert!(argon.verify(b"secret", &pbkdf_record));
}

#[test]
fn test_malformed_records_fail_closed() {
    for hasher in hashers() {
        for record in ["", "plaintext", "$unknown$v=1$abc$def", "$argon2id$", "$pbkdf2-sha256$i=x"] {
            assert!(!hasher.verify(b"secret", record));
        }
    }
}

#[tokio::test]
async fn test_blocking_pool_hash_and_verify() {
    let hasher = CredentialHasher::new(HashAlgorithm::Pbkdf2Sha256 { rounds: 1000 }).unwrap();
    let record = hasher.spawn_hash("secret".to_string()).await.unwrap();

    assert!(hasher
        .spawn_verify("secret".to_string(), record.clone())
        .await
        .unwrap());
    assert!(!hasher
        .spawn_verify("other".to_string(), record)
        .await
        .unwrap());
}
