// src/device/identity.rs

use crate::storage::kv_store::KvStore;
use rand::Rng;
use tracing::{info, warn};

/// 设备码字符集与长度（大写字母 + 数字，6 位）
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

const KEY: &str = "device-code";

/// 读取或生成设备码
///
/// 首次启动时生成一个均匀随机的设备码并持久化；之后每次启动读回同一个值。
/// 持久化失败只记 warn，本次会话继续使用内存里的码。
pub fn get_or_create(store: &KvStore) -> String {
    if let Some(code) = store.get::<String>(KEY) {
        if !code.is_empty() {
            return code;
        }
    }

    let code = generate();
    info!("generated new device code: {}", code);
    if !store.set(KEY, &code) {
        warn!("device code not persisted, using in-memory code for this session");
    }
    code
}

fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
