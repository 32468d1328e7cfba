// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库，支持英文（默认）和中文
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use crew_optimizer::i18n::t_with_args;
/// let msg = t_with_args("claim.quota_exceeded", &[("requested", "5"), ("remaining", "2")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale 为全局状态，相关测试需串行
    pub(crate) static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
        set_locale("en");
        assert_eq!(current_locale(), "en");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("claim.quota_exceeded", &[("requested", "5"), ("remaining", "2")]);
        assert_eq!(
            msg,
            "You can't take 5 more vacation days, you have only 2 days left!"
        );

        set_locale("zh-CN");
        let msg = t_with_args("claim.quota_exceeded", &[("requested", "5"), ("remaining", "2")]);
        assert!(msg.contains('2'));
        assert!(msg.contains("休假"));
        set_locale("en");
    }

    #[test]
    fn test_solver_status_keys_exist() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(t("solver.OPTIMAL"), "The schedule was solved to optimality.");
        assert!(t("solver.NOT_SOLVED").contains("time"));
    }
}
