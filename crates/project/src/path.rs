use std::cmp::Ordering;

/// Joins a parent path and a child name with a `/` separator. A root-less
/// parent yields the bare name.  
/// 以 `/` 分隔符號串接父路徑與子名稱；若父路徑為空則直接回傳名稱。
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Returns the last `/`-delimited segment of a path.  
/// 取得路徑中最後一段 `/` 分隔的名稱。
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Case-aware ascending comparison used by the sibling sort policy. Names
/// compare by their lowercased forms first, raw forms as a tie-break so the
/// ordering stays total.  
/// 兄弟節點排序策略使用的大小寫感知遞增比較；先比較小寫形式，再以原始字串決勝。
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
