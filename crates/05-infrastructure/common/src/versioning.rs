//! 版本相关的基础接口定义

/// 可版本化对象 trait
///
/// 跨版本用 `id` 标识同一个对象，用 `version` 区分不同快照。
pub trait Versionable {
    /// 跨版本不变的标识
    fn id(&self) -> &str;

    /// 当前快照的版本
    fn version(&self) -> &str;

    /// 标识的根路径前缀
    fn id_prefix(&self) -> &str {
        ""
    }
}

/// 逻辑版本 trait
pub trait LogicalVersion {
    /// 不含版本信息的名称
    fn name(&self) -> &str;

    /// 主版本号
    fn major_version(&self) -> u32;

    /// 次版本号
    fn minor_version(&self) -> u32;

    /// 补丁版本号
    fn patch_version(&self) -> u32;

    /// 名称 + 分隔符 + 完整版本
    fn logical_version_string(&self, separator: &str) -> String {
        format!("{}{}{}", self.name(), separator, self.patch_version_string())
    }

    /// 主版本字符串，例如 `1`
    fn major_version_string(&self) -> String {
        self.major_version().to_string()
    }

    /// 次版本字符串，例如 `1.2`
    fn minor_version_string(&self) -> String {
        format!("{}.{}", self.major_version(), self.minor_version())
    }

    /// 补丁版本字符串，例如 `1.2.3`
    fn patch_version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            self.major_version(),
            self.minor_version(),
            self.patch_version()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl LogicalVersion for Fixed {
        fn name(&self) -> &str {
            "us_consumers/lob/policy_a"
        }
        fn major_version(&self) -> u32 {
            1
        }
        fn minor_version(&self) -> u32 {
            2
        }
        fn patch_version(&self) -> u32 {
            3
        }
    }

    #[test]
    fn test_version_strings() {
        assert_eq!(Fixed.major_version_string(), "1");
        assert_eq!(Fixed.minor_version_string(), "1.2");
        assert_eq!(Fixed.patch_version_string(), "1.2.3");
        assert_eq!(
            Fixed.logical_version_string("/"),
            "us_consumers/lob/policy_a/1.2.3"
        );
    }
}
