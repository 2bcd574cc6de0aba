//! # 手工封禁列表
//!
//! 以追加式行文件持久化的封禁集合；启动时载入，管理操作时回写。
//! 文件读写失败一律降级为安全默认并记录日志，不会影响请求处理。

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

/// 封禁列表存储
///
/// 内存集合是请求期间的唯一权威；解除封禁前先从文件重载，
/// 以吸收进程外的追加修改。所有变更操作经由同一把写锁串行化。
pub struct BlocklistStore {
    path: PathBuf,
    entries: RwLock<HashSet<String>>,
}

impl BlocklistStore {
    /// 从文件加载封禁列表；文件缺失或读取失败时回退为空集合
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => {
                info!("已加载 {} 条封禁记录: {}", entries.len(), path.display());
                entries
            }
            Err(e) => {
                warn!("读取封禁列表失败 ({}): {e}，使用空列表", path.display());
                HashSet::new()
            }
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn read_entries(path: &Path) -> std::io::Result<HashSet<String>> {
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(std::string::ToString::to_string)
            .collect())
    }

    /// 判断标识是否在封禁列表中
    pub fn is_blocked(&self, id: &str) -> bool {
        self.entries
            .read()
            .expect("blocklist lock poisoned")
            .contains(id)
    }

    /// 封禁一个标识：追加到文件并写入内存集合
    ///
    /// 重复封禁会在文件中产生重复行，重载时由集合去重，可以容忍。
    pub fn block(&self, id: &str) {
        let mut entries = self.entries.write().expect("blocklist lock poisoned");
        if let Err(e) = Self::append_line(&self.path, id) {
            warn!("追加封禁记录失败 ({}): {e}", self.path.display());
        }
        entries.insert(id.to_string());
    }

    fn append_line(path: &Path, id: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{id}")
    }

    /// 解除封禁：先重载文件，移除后整体回写
    ///
    /// 返回该标识此前是否处于封禁状态。
    pub fn unblock(&self, id: &str) -> bool {
        let mut entries = self.entries.write().expect("blocklist lock poisoned");

        // 先吸收进程外的修改，避免覆盖并发追加的条目
        match Self::read_entries(&self.path) {
            Ok(reloaded) => *entries = reloaded,
            Err(e) => warn!("重载封禁列表失败 ({}): {e}", self.path.display()),
        }

        if !entries.remove(id) {
            return false;
        }

        if let Err(e) = Self::rewrite(&self.path, &entries) {
            warn!("回写封禁列表失败 ({}): {e}", self.path.display());
        }
        true
    }

    fn rewrite(path: &Path, entries: &HashSet<String>) -> std::io::Result<()> {
        let mut content = String::new();
        for entry in entries {
            content.push_str(entry);
            content.push('\n');
        }
        fs::write(path, content)
    }

    /// 当前封禁条目数
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("blocklist lock poisoned")
            .len()
    }

    /// 封禁列表是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
