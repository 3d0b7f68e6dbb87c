//! Contract surface tests - signatures, call encoding and tuple decoding

use alloy_dyn_abi::DynSolValue;
use disaster_reports::abi::{self, FUNCTIONS};
use disaster_reports::models::{NewReport, Report, ReportImage};
use std::collections::HashSet;

const REPORTER: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

fn report() -> Report {
    Report {
        reporter: REPORTER.to_string(),
        reporter_name: "Rosa".into(),
        email: "rosa@example.org".into(),
        disaster_type: "Volcanic Eruption".into(),
        img_url: "https://ipfs.io/ipfs/QmVolcano".into(),
        latitude: "13.2566".into(),
        longitude: "123.6853".into(),
        city: "Legazpi".into(),
        state: "Albay".into(),
        date: "2024-06-01".into(),
        severity: "Critical".into(),
        impact: "Ash fall across three towns".into(),
    }
}

#[test]
fn signatures_match_the_deployed_contract() {
    let sigs: Vec<String> = FUNCTIONS.iter().map(|f| f.signature()).collect();
    assert_eq!(
        sigs,
        vec![
            "getDisasterReportLength()",
            "getDisasterReport(uint256)",
            "getDisasterImages(uint256)",
            "createDisasterReport(string,string,string,string,string,string,string,string,string,string,string)",
            "deleteDisasterReport(uint256)",
            "addDisasterImage(uint256,string,string)",
            "deleteDisasterImage(uint256,uint256)",
        ]
    );
    let selectors: HashSet<[u8; 4]> = FUNCTIONS.iter().map(|f| f.selector()).collect();
    assert_eq!(selectors.len(), FUNCTIONS.len());
}

#[test]
fn only_writes_are_mutating() {
    let writes: Vec<&str> = FUNCTIONS
        .iter()
        .filter(|f| f.mutating)
        .map(|f| f.name)
        .collect();
    assert_eq!(
        writes,
        vec![
            "createDisasterReport",
            "deleteDisasterReport",
            "addDisasterImage",
            "deleteDisasterImage"
        ]
    );
}

#[test]
fn call_data_starts_with_selector() {
    let data = abi::DELETE_IMAGE
        .encode_call(&[abi::uint(3), abi::uint(1)])
        .unwrap();
    assert_eq!(&data[..4], &abi::DELETE_IMAGE.selector());
    assert_eq!(data.len(), 4 + 64);
    assert_eq!(data[4 + 31], 3);
    assert_eq!(data[4 + 63], 1);
    assert_eq!(
        abi::function_for_selector(&data[..4]).map(|f| f.name),
        Some("deleteDisasterImage")
    );
}

#[test]
fn wrong_arguments_are_refused() {
    assert!(abi::DELETE_REPORT.encode_call(&[]).is_err());
    assert!(abi::DELETE_REPORT
        .encode_call(&[abi::string("0")])
        .is_err());
}

#[test]
fn report_tuple_maps_positionally() {
    let expected = report();
    let encoded = abi::GET_REPORT.encode_output(&abi::encode_report(&expected).unwrap());
    let values = abi::GET_REPORT.decode_output(&encoded).unwrap();

    assert!(matches!(values[0], DynSolValue::Address(_)));
    let decoded = abi::decode_report(&values).unwrap();
    assert_eq!(decoded.reporter, REPORTER);
    assert_eq!(decoded.reporter_name, "Rosa");
    assert_eq!(decoded.img_url, "https://ipfs.io/ipfs/QmVolcano");
    assert_eq!(decoded.city, "Legazpi");
    assert_eq!(decoded.impact, "Ash fall across three towns");
    assert_eq!(decoded, expected);
}

#[test]
fn short_tuple_is_an_error() {
    let values = vec![abi::string("only one")];
    assert!(abi::decode_report(&values).is_err());
}

#[test]
fn create_arguments_follow_form_order() {
    let new = NewReport {
        reporter_name: "a".into(),
        email: "b".into(),
        disaster_type: "c".into(),
        img_url: "d".into(),
        latitude: "e".into(),
        longitude: "f".into(),
        city: "g".into(),
        state: "h".into(),
        date: "i".into(),
        severity: "j".into(),
        impact: "k".into(),
    };
    let args = abi::new_report_args(&new);
    let letters: Vec<String> = args
        .iter()
        .map(|v| match v {
            DynSolValue::String(s) => s.clone(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(letters.concat(), "abcdefghijk");
    assert_eq!(abi::new_report_from_args(&args).unwrap(), new);
}

#[test]
fn image_list_decodes() {
    let images = vec![
        ReportImage {
            reporter: REPORTER.to_string(),
            timestamp: "2024-06-02T08:00:00.000Z".into(),
            image_url: "https://ipfs.io/ipfs/QmA".into(),
        },
        ReportImage {
            reporter: REPORTER.to_string(),
            timestamp: "2024-06-03T08:00:00.000Z".into(),
            image_url: "https://ipfs.io/ipfs/QmB".into(),
        },
    ];
    let encoded = abi::GET_IMAGES.encode_output(&abi::encode_images(&images).unwrap());
    let values = abi::GET_IMAGES.decode_output(&encoded).unwrap();
    assert_eq!(abi::decode_images(&values).unwrap(), images);

    let empty = abi::GET_IMAGES.encode_output(&abi::encode_images(&[]).unwrap());
    let values = abi::GET_IMAGES.decode_output(&empty).unwrap();
    assert!(abi::decode_images(&values).unwrap().is_empty());
}
