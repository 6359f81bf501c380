// 加密工具函数
// 提供SHA-512摘要、常量时间比较、交易号生成等安全功能

use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha512};

/// 交易号随机部分长度
const TXN_RANDOM_LENGTH: usize = 12;

/// 计算SHA-512摘要
///
/// # Arguments
/// * `message` - 待计算的消息
///
/// # Returns
/// * 128位小写十六进制字符串
pub fn sha512_hex(message: &str) -> String {
    let digest = Sha512::digest(message.as_bytes());
    hex::encode(digest)
}

/// 常量时间字符串比较 (防止时序攻击)
///
/// # Arguments
/// * `a` - 字符串A
/// * `b` - 字符串B
///
/// # Returns
/// * 字符串是否相等
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// 生成唯一交易号
///
/// 格式: `{prefix}_{毫秒时间戳}_{12位随机小写字母数字}`
/// 无需任何协调即可在多实例并发调用下保持唯一
///
/// # Arguments
/// * `prefix` - 交易号前缀
///
/// # Returns
/// * 交易号字符串
pub fn generate_transaction_id(prefix: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let random = generate_secure_random_string(TXN_RANDOM_LENGTH).to_ascii_lowercase();
    format!("{}_{}_{}", prefix, timestamp, random)
}

/// 生成安全的随机字符串
///
/// # Arguments
/// * `length` - 字符串长度
///
/// # Returns
/// * 随机字符串
pub fn generate_secure_random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// 脱敏显示密钥，只保留前几位
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}...", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sha512_hex() {
        let empty = sha512_hex("");
        assert_eq!(
            empty,
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
        assert_eq!(sha512_hex("donation").len(), 128);
        assert!(sha512_hex("donation").chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello world"));
    }

    #[test]
    fn test_generate_transaction_id_format() {
        let txnid = generate_transaction_id("BYB");
        let parts: Vec<&str> = txnid.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "BYB");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), TXN_RANDOM_LENGTH);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let ids: HashSet<String> = (0..100_000)
            .map(|_| generate_transaction_id("BYB"))
            .collect();
        assert_eq!(ids.len(), 100_000);
    }

    #[test]
    fn test_transaction_ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..10_000)
                        .map(|_| generate_transaction_id("BYB"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 80_000);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("unK6WU6ur2jKDBDk"), "unK6...");
        assert_eq!(mask_secret("ab"), "ab...");
    }
}
