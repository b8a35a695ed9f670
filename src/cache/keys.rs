/// 会话缓存键前缀
const SESSION_PREFIX: &str = "session:";

/// 生成用户当前会话令牌的缓存键
pub fn session_key(username: &str) -> String {
    format!("{}{}", SESSION_PREFIX, username)
}
