use std::env;
use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tokio_test::{assert_err, assert_ok};

use renewal_watch::config::{WatchConfig, CONFIG_FILE_ENV, ENV_OVERRIDES};
use renewal_watch::telegram::Destination;

/// Clear every override and point the loader at a file that does not exist,
/// so a developer's local `config.toml` cannot leak into the tests.
fn reset_env() {
    for (_, var) in ENV_OVERRIDES {
        env::remove_var(var);
    }
    env::set_var(CONFIG_FILE_ENV, "/nonexistent/renewal-watch-test");
}

fn set_required_env() {
    env::set_var("RENEWAL_TELEGRAM_BOT_TOKEN", "123456:test-token");
    env::set_var("RENEWAL_SPREADSHEET_ID", "1AbCdEf");
    env::set_var("RENEWAL_SHEETS_ACCESS_TOKEN", "ya29.test");
    env::set_var("RENEWAL_NOTIFY_CHAT_ID", "-1002934465528");
    env::set_var("RENEWAL_NOTIFY_THREAD_ID", "12");
    env::set_var("RENEWAL_ERRORS_CHAT_ID", "-1002934465528");
    env::set_var("RENEWAL_ERRORS_THREAD_ID", "6");
}

fn write_config_file(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("{name}-{}.toml", std::process::id()));
    fs::write(&path, contents).expect("failed to write temp config");
    path
}

#[test]
#[serial]
fn environment_alone_is_enough_to_run() {
    reset_env();
    set_required_env();

    let config = assert_ok!(WatchConfig::load());
    let settings = assert_ok!(config.job_settings());

    assert_eq!(settings.notify_destination, Destination::new("-1002934465528", 12));
    assert_eq!(settings.error_destination, Destination::new("-1002934465528", 6));
    assert_eq!(settings.notify_days, 4);
    assert_eq!(settings.utc_offset.local_minus_utc(), 7 * 3600);
    assert_eq!(settings.order_sheet.title, "Orders");
    assert!(settings.notify_enabled);

    reset_env();
}

#[test]
#[serial]
fn missing_bot_token_is_rejected() {
    reset_env();
    set_required_env();
    env::remove_var("RENEWAL_TELEGRAM_BOT_TOKEN");

    let config = assert_ok!(WatchConfig::load());
    let err = assert_err!(config.job_settings());
    assert!(err.to_string().contains("telegram.bot_token"));

    reset_env();
}

#[test]
#[serial]
fn empty_env_values_do_not_override() {
    reset_env();
    set_required_env();
    env::set_var("RENEWAL_ORDER_SHEET", "");

    let config = WatchConfig::load().expect("config should load");
    assert_eq!(config.sheets.order_sheet, "Orders");

    reset_env();
}

#[test]
#[serial]
fn environment_wins_over_file() {
    reset_env();
    set_required_env();

    let path = write_config_file(
        "renewal-watch-precedence",
        r#"
[sheets]
order_sheet = "Bảng Đơn Hàng"
order_sheet_gid = 812345

[job]
notify_days = 3
reseller_prefix = "CTV"

[notify]
enabled = true
"#,
    );
    env::set_var(CONFIG_FILE_ENV, &path);
    env::set_var("RENEWAL_NOTIFY_DAYS", "5");
    env::set_var("RENEWAL_NOTIFY_ENABLED", "false");

    let config = WatchConfig::load().expect("config should load");
    let settings = config.job_settings().expect("config should validate");

    assert_eq!(settings.order_sheet.title, "Bảng Đơn Hàng");
    assert_eq!(settings.order_sheet.gid, 812345);
    assert_eq!(settings.reseller_prefix, "CTV");
    assert_eq!(settings.notify_days, 5);
    assert!(!settings.notify_enabled);

    let _ = fs::remove_file(&path);
    reset_env();
}

#[test]
#[serial]
fn pacing_and_offset_come_from_env() {
    reset_env();
    set_required_env();
    env::set_var("RENEWAL_SEND_INTERVAL_MS", "250");
    env::set_var("RENEWAL_DELETE_INTERVAL_MS", "100");
    env::set_var("RENEWAL_UTC_OFFSET_HOURS", "-5");

    let settings = WatchConfig::load()
        .expect("config should load")
        .job_settings()
        .expect("config should validate");

    assert_eq!(settings.pacing.send_interval.as_millis(), 250);
    assert_eq!(settings.pacing.delete_interval.as_millis(), 100);
    assert_eq!(settings.utc_offset.local_minus_utc(), -5 * 3600);

    reset_env();
}

#[test]
#[serial]
fn zero_notify_days_is_rejected() {
    reset_env();
    set_required_env();
    env::set_var("RENEWAL_NOTIFY_DAYS", "0");

    let config = assert_ok!(WatchConfig::load());
    assert_err!(config.job_settings());

    reset_env();
}
