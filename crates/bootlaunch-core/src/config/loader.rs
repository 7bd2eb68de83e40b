//! 统一环境变量加载逻辑
//!
//! 集中维护 fallback 链：进程环境变量优先，其次是 base 目录下的 `.env`。
//! `.env` 只解析进内存，不会写回进程环境。

use std::collections::HashMap;
use std::env;
use std::path::Path;

/// 配置来源：进程环境变量 + `.env` 映射
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    use_process_env: bool,
    fallback: HashMap<String, String>,
}

impl ConfigSource {
    /// 读取进程环境变量（启动时构造一次）
    pub fn from_process() -> Self {
        Self {
            use_process_env: true,
            fallback: HashMap::new(),
        }
    }

    /// 仅使用给定的键值对，忽略进程环境（测试与嵌入场景）
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            use_process_env: false,
            fallback: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 加载 `dir/.env`（不覆盖已存在的键）
    pub fn with_dotenv_dir(mut self, dir: &Path) -> Self {
        let path = dir.join(".env");
        if let Ok(content) = std::fs::read_to_string(&path) {
            let mut loaded = 0usize;
            for (key, value) in parse_dotenv(&content) {
                self.fallback.entry(key).or_insert_with(|| {
                    loaded += 1;
                    value
                });
            }
            tracing::debug!(path = %path.display(), loaded, "Loaded .env");
        }
        self
    }

    /// 原始读取：进程环境优先，其次 `.env`
    pub fn get(&self, key: &str) -> Option<String> {
        if self.use_process_env {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.fallback.get(key).cloned()
    }

    /// 单个键的有效值：去除首尾空白，空值视为未设置（进程环境为空时回落到 `.env`）
    fn get_set(&self, key: &str) -> Option<String> {
        let non_blank = |v: String| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };
        if self.use_process_env {
            if let Some(v) = env::var(key).ok().and_then(non_blank) {
                return Some(v);
            }
        }
        self.fallback.get(key).cloned().and_then(non_blank)
    }

    fn lookup(&self, primary: &str, aliases: &[&str]) -> Option<String> {
        std::iter::once(&primary)
            .chain(aliases)
            .find_map(|key| self.get_set(key))
    }

    /// 从主变量或别名链读取，失败时使用默认值
    pub fn env_or<F>(&self, primary: &str, aliases: &[&str], default: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.env_optional(primary, aliases).unwrap_or_else(default)
    }

    /// 从主变量或别名链读取，返回 Option（空值视为未设置）
    pub fn env_optional(&self, primary: &str, aliases: &[&str]) -> Option<String> {
        self.lookup(primary, aliases)
    }

    /// 解析布尔型环境变量：0/false/no/off 为 false，其余非空值为 true
    pub fn env_bool(&self, primary: &str, aliases: &[&str], default: bool) -> bool {
        match self.env_optional(primary, aliases) {
            Some(s) => !matches!(
                s.to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
            None => default,
        }
    }

    /// 解析无符号整数；无法解析时记录警告并使用默认值
    pub fn env_u64(&self, primary: &str, aliases: &[&str], default: u64) -> u64 {
        match self.env_optional(primary, aliases) {
            Some(s) => s.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!("Invalid {}: {:?}, using default ({})", primary, s, default);
                default
            }),
            None => default,
        }
    }
}

/// 解析 `.env` 内容：`KEY=VALUE`，支持 `#` 注释、引号、行尾注释
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_quotes_and_comments() {
        let content = "# comment\n\
                       BOOTLAUNCH_TOOL=standard # prefer pip\n\
                       export BOOTLAUNCH_PAYLOAD=\"main.py\"\n\
                       BOOTLAUNCH_PROBE_MODULE='requests'\n\
                       not a pair\n\
                       =orphan\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("BOOTLAUNCH_TOOL".to_string(), "standard".to_string()),
                ("BOOTLAUNCH_PAYLOAD".to_string(), "main.py".to_string()),
                ("BOOTLAUNCH_PROBE_MODULE".to_string(), "requests".to_string()),
            ]
        );
    }

    #[test]
    fn test_dotenv_does_not_override_existing_keys() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(".env"),
            "BOOTLAUNCH_TOOL=fast\nBOOTLAUNCH_PAYLOAD=main.py\n",
        )
        .unwrap();
        let source = ConfigSource::from_pairs([("BOOTLAUNCH_TOOL", "standard")])
            .with_dotenv_dir(tmp.path());
        assert_eq!(source.get("BOOTLAUNCH_TOOL").as_deref(), Some("standard"));
        assert_eq!(source.get("BOOTLAUNCH_PAYLOAD").as_deref(), Some("main.py"));
    }

    #[test]
    fn test_missing_dotenv_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let source = ConfigSource::from_pairs(Vec::<(String, String)>::new())
            .with_dotenv_dir(tmp.path());
        assert!(source.get("BOOTLAUNCH_TOOL").is_none());
    }

    #[test]
    fn test_helpers_treat_empty_as_unset() {
        let source = ConfigSource::from_pairs([
            ("EMPTY", "  "),
            ("ALIAS", "from-alias"),
            ("FLAG_OFF", "Off"),
            ("FLAG_ON", "yes"),
            ("NUM", "42"),
            ("BAD_NUM", "forty"),
        ]);
        assert_eq!(source.env_optional("EMPTY", &[]), None);
        assert_eq!(source.env_or("EMPTY", &["ALIAS"], String::new), "from-alias");
        assert_eq!(source.env_or("MISSING", &[], || "dflt".to_string()), "dflt");
        assert!(!source.env_bool("FLAG_OFF", &[], true));
        assert!(source.env_bool("FLAG_ON", &[], false));
        assert!(source.env_bool("MISSING", &[], true));
        assert_eq!(source.env_u64("NUM", &[], 1), 42);
        assert_eq!(source.env_u64("BAD_NUM", &[], 7), 7);
    }

    #[test]
    fn test_blank_primary_does_not_hide_alias() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(".env"),
            "BOOTLAUNCH_ENV_DIR_NAME=\nBOOTLAUNCH_VENV_NAME=  .pyenv  \n",
        )
        .unwrap();
        let source = ConfigSource::from_pairs(Vec::<(String, String)>::new())
            .with_dotenv_dir(tmp.path());
        assert_eq!(
            source.env_optional("BOOTLAUNCH_ENV_DIR_NAME", &["BOOTLAUNCH_VENV_NAME"]),
            Some(".pyenv".to_string())
        );
        assert_eq!(source.env_optional("BOOTLAUNCH_ENV_DIR_NAME", &[]), None);
    }
}
