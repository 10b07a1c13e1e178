//! 把配置文档深度合并到内置默认值之上。
//!
//! 映射逐键递归合并。覆盖文档中的序列和标量
//! 整体替换原值。覆盖文档中的 `null` 视为
//! “未提供”，原值保持不变。

use serde_yaml::Value;

pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key.clone(), without_nulls(value));
                    }
                }
            }
        }
        (slot, value) => *slot = without_nulls(value),
    }
}

/// 复制 `value`，并去掉任意层级中值为 `null` 的映射项
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), without_nulls(v)))
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.iter().map(without_nulls).collect()),
        other => other.clone(),
    }
}

/// 返回合并后的副本，两个输入保持不变
pub fn merged(base: &Value, overlay: &Value) -> Value {
    let mut out = base.clone();
    deep_merge(&mut out, overlay);
    out
}
