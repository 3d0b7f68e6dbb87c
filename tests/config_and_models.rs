//! Configuration and presentation helper tests

use disaster_reports::config::{resolve, ConfigArgs, NetworkConfig};
use disaster_reports::models::{severity_class, SeverityClass, DISASTER_TYPES, SEVERITY_LEVELS};
use disaster_reports::submission::{is_valid_email, ReportForm};
use std::io::Write;

#[test]
fn network_file_overrides_preset() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
chain_id = 44787
name = "Celo Alfajores Testnet"
rpc_url = "https://alfajores-forno.celo-testnet.org"
ticker = "CELO"
explorer_url = "https://alfajores.celoscan.io"
"#
    )
    .unwrap();

    let cfg = resolve(ConfigArgs {
        network: Some("celo".into()),
        network_file: Some(file.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(cfg.network.chain_id, 44787);
    assert_eq!(cfg.network.decimals, 18);
    assert_eq!(cfg.network.chain_id_hex(), "0xaef3");
}

#[test]
fn rpc_url_flag_wins_over_network() {
    let cfg = resolve(ConfigArgs {
        rpc_url: Some("https://rpc.ankr.com/celo".into()),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(cfg.network.rpc_url, "https://rpc.ankr.com/celo");
    assert_eq!(cfg.network.name, NetworkConfig::celo_mainnet().name);
}

#[test]
fn bad_contract_address_is_rejected() {
    let err = resolve(ConfigArgs {
        contract_address: Some("0x1234".into()),
        ..Default::default()
    })
    .unwrap_err();
    assert!(err.to_string().contains("CONTRACT_ADDRESS"));
}

#[test]
fn vocabularies_cover_the_form_choices() {
    assert_eq!(DISASTER_TYPES.len(), 14);
    assert_eq!(DISASTER_TYPES.last(), Some(&"Other"));
    let classes: Vec<SeverityClass> = SEVERITY_LEVELS.iter().map(|s| severity_class(s)).collect();
    assert_eq!(
        classes,
        vec![
            SeverityClass::Calm,
            SeverityClass::Warning,
            SeverityClass::Danger,
            SeverityClass::Danger
        ]
    );
}

#[test]
fn fresh_form_is_dated_today_and_incomplete() {
    let form = ReportForm::new();
    assert!(chrono::NaiveDate::parse_from_str(&form.date, "%Y-%m-%d").is_ok());
    assert!(form.validate().is_err());
    assert!(is_valid_email("first.last@agency.gov.ph"));
    assert!(!is_valid_email("first last@agency.gov.ph"));
}
