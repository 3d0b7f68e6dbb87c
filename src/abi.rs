//! Fixed function surface of the disaster report contract.
//!
//! Return tuples are consumed positionally: `getDisasterReport` yields
//! `(address, string × 11)` in exactly the field order of [`Report`], and
//! `getDisasterImages` yields `(address reporterId, string timestamp,
//! string disasterImageUrl)[]`. Keep these in lock-step with the deployed ABI.

use crate::models::{NewReport, Report, ReportImage};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, U256};
use anyhow::{anyhow, bail, Context, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContractFunction {
    pub name: &'static str,
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
    pub mutating: bool,
}

pub const GET_REPORT_LENGTH: ContractFunction = ContractFunction {
    name: "getDisasterReportLength",
    inputs: &[],
    outputs: &["uint256"],
    mutating: false,
};

pub const GET_REPORT: ContractFunction = ContractFunction {
    name: "getDisasterReport",
    inputs: &["uint256"],
    outputs: &[
        "address", "string", "string", "string", "string", "string", "string", "string", "string",
        "string", "string", "string",
    ],
    mutating: false,
};

pub const GET_IMAGES: ContractFunction = ContractFunction {
    name: "getDisasterImages",
    inputs: &["uint256"],
    outputs: &["(address,string,string)[]"],
    mutating: false,
};

pub const CREATE_REPORT: ContractFunction = ContractFunction {
    name: "createDisasterReport",
    inputs: &[
        "string", "string", "string", "string", "string", "string", "string", "string", "string",
        "string", "string",
    ],
    outputs: &[],
    mutating: true,
};

pub const DELETE_REPORT: ContractFunction = ContractFunction {
    name: "deleteDisasterReport",
    inputs: &["uint256"],
    outputs: &[],
    mutating: true,
};

pub const ADD_IMAGE: ContractFunction = ContractFunction {
    name: "addDisasterImage",
    inputs: &["uint256", "string", "string"],
    outputs: &[],
    mutating: true,
};

pub const DELETE_IMAGE: ContractFunction = ContractFunction {
    name: "deleteDisasterImage",
    inputs: &["uint256", "uint256"],
    outputs: &[],
    mutating: true,
};

pub const FUNCTIONS: &[ContractFunction] = &[
    GET_REPORT_LENGTH,
    GET_REPORT,
    GET_IMAGES,
    CREATE_REPORT,
    DELETE_REPORT,
    ADD_IMAGE,
    DELETE_IMAGE,
];

fn parse_types(kinds: &[&str]) -> Result<Vec<DynSolType>> {
    kinds
        .iter()
        .map(|k| {
            k.parse::<DynSolType>()
                .map_err(|e| anyhow!("Failed to parse type '{k}': {e}"))
        })
        .collect()
}

impl ContractFunction {
    /// Canonical signature, e.g. `addDisasterImage(uint256,string,string)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.inputs.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn encode_call(&self, args: &[DynSolValue]) -> Result<Vec<u8>> {
        if args.len() != self.inputs.len() {
            bail!(
                "{} takes {} arguments, got {}",
                self.name,
                self.inputs.len(),
                args.len()
            );
        }
        let types = parse_types(self.inputs)?;
        for (i, (ty, arg)) in types.iter().zip(args).enumerate() {
            if !ty.matches(arg) {
                bail!("{} argument {i} is not a {}", self.name, self.inputs[i]);
            }
        }
        let mut data = self.selector().to_vec();
        if !args.is_empty() {
            data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
        }
        Ok(data)
    }

    /// Decode call arguments (without selector) back into values.
    pub fn decode_args(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        decode_sequence(self.inputs, data).with_context(|| format!("decoding {} args", self.name))
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        decode_sequence(self.outputs, data)
            .with_context(|| format!("decoding {} output", self.name))
    }

    pub fn encode_output(&self, values: &[DynSolValue]) -> Vec<u8> {
        if values.is_empty() {
            return Vec::new();
        }
        DynSolValue::Tuple(values.to_vec()).abi_encode_params()
    }
}

fn decode_sequence(kinds: &[&str], data: &[u8]) -> Result<Vec<DynSolValue>> {
    if kinds.is_empty() {
        return Ok(Vec::new());
    }
    let ty = DynSolType::Tuple(parse_types(kinds)?);
    match ty.abi_decode_sequence(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Find a function by its 4-byte selector.
pub fn function_for_selector(selector: &[u8]) -> Option<ContractFunction> {
    FUNCTIONS
        .iter()
        .find(|f| f.selector()[..] == *selector)
        .copied()
}

pub fn uint(v: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(v), 256)
}

pub fn string(s: &str) -> DynSolValue {
    DynSolValue::String(s.to_string())
}

fn as_string(v: &DynSolValue, field: &str) -> Result<String> {
    match v {
        DynSolValue::String(s) => Ok(s.clone()),
        other => Err(anyhow!("{field}: expected string, got {other:?}")),
    }
}

fn as_address(v: &DynSolValue, field: &str) -> Result<String> {
    match v {
        DynSolValue::Address(a) => Ok(a.to_checksum(None)),
        other => Err(anyhow!("{field}: expected address, got {other:?}")),
    }
}

pub fn as_u64(v: &DynSolValue) -> Result<u64> {
    match v {
        DynSolValue::Uint(u, _) => {
            if *u > U256::from(u64::MAX) {
                bail!("uint {u} does not fit in u64");
            }
            Ok(u.to::<u64>())
        }
        other => Err(anyhow!("expected uint, got {other:?}")),
    }
}

/// Arguments for `createDisasterReport`, in ABI order.
pub fn new_report_args(r: &NewReport) -> Vec<DynSolValue> {
    [
        &r.reporter_name,
        &r.email,
        &r.disaster_type,
        &r.img_url,
        &r.latitude,
        &r.longitude,
        &r.city,
        &r.state,
        &r.date,
        &r.severity,
        &r.impact,
    ]
    .into_iter()
    .map(|s| string(s))
    .collect()
}

pub fn new_report_from_args(values: &[DynSolValue]) -> Result<NewReport> {
    if values.len() != 11 {
        bail!("createDisasterReport takes 11 fields, got {}", values.len());
    }
    let s = |i: usize, name: &str| as_string(&values[i], name);
    Ok(NewReport {
        reporter_name: s(0, "reporterName")?,
        email: s(1, "email")?,
        disaster_type: s(2, "disasterType")?,
        img_url: s(3, "imgUrl")?,
        latitude: s(4, "latitude")?,
        longitude: s(5, "longitude")?,
        city: s(6, "city")?,
        state: s(7, "state")?,
        date: s(8, "date")?,
        severity: s(9, "severity")?,
        impact: s(10, "impact")?,
    })
}

/// Map the `getDisasterReport` tuple onto a [`Report`].
pub fn decode_report(values: &[DynSolValue]) -> Result<Report> {
    if values.len() != GET_REPORT.outputs.len() {
        bail!(
            "getDisasterReport returned {} fields, expected {}",
            values.len(),
            GET_REPORT.outputs.len()
        );
    }
    let reporter = as_address(&values[0], "reporterId")?;
    let rest = new_report_from_args(&values[1..])?;
    Ok(rest.into_report(reporter))
}

pub fn encode_report(r: &Report) -> Result<Vec<DynSolValue>> {
    let reporter: Address = r
        .reporter
        .parse()
        .map_err(|e| anyhow!("bad reporter address {}: {e}", r.reporter))?;
    let fields = NewReport {
        reporter_name: r.reporter_name.clone(),
        email: r.email.clone(),
        disaster_type: r.disaster_type.clone(),
        img_url: r.img_url.clone(),
        latitude: r.latitude.clone(),
        longitude: r.longitude.clone(),
        city: r.city.clone(),
        state: r.state.clone(),
        date: r.date.clone(),
        severity: r.severity.clone(),
        impact: r.impact.clone(),
    };
    let mut out = vec![DynSolValue::Address(reporter)];
    out.extend(new_report_args(&fields));
    Ok(out)
}

pub fn decode_images(values: &[DynSolValue]) -> Result<Vec<ReportImage>> {
    let list = match values.first() {
        Some(DynSolValue::Array(items)) => items,
        other => bail!("getDisasterImages: expected array, got {other:?}"),
    };
    list.iter()
        .map(|item| match item {
            DynSolValue::Tuple(fields) if fields.len() == 3 => Ok(ReportImage {
                reporter: as_address(&fields[0], "reporterId")?,
                timestamp: as_string(&fields[1], "timestamp")?,
                image_url: as_string(&fields[2], "disasterImageUrl")?,
            }),
            other => Err(anyhow!("getDisasterImages: bad entry {other:?}")),
        })
        .collect()
}

pub fn encode_images(images: &[ReportImage]) -> Result<Vec<DynSolValue>> {
    let items = images
        .iter()
        .map(|img| {
            let reporter: Address = img
                .reporter
                .parse()
                .map_err(|e| anyhow!("bad reporter address {}: {e}", img.reporter))?;
            Ok(DynSolValue::Tuple(vec![
                DynSolValue::Address(reporter),
                string(&img.timestamp),
                string(&img.image_url),
            ]))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(vec![DynSolValue::Array(items)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_distinct_and_resolvable() {
        for f in FUNCTIONS {
            assert_eq!(function_for_selector(&f.selector()), Some(*f), "{}", f.name);
        }
        assert!(function_for_selector(&[0, 0, 0, 0]).is_none());
    }

    #[test]
    fn signature_is_canonical() {
        assert_eq!(
            ADD_IMAGE.signature(),
            "addDisasterImage(uint256,string,string)"
        );
        assert_eq!(GET_REPORT_LENGTH.signature(), "getDisasterReportLength()");
    }

    #[test]
    fn encode_rejects_wrong_arity_and_types() {
        assert!(DELETE_REPORT.encode_call(&[]).is_err());
        assert!(DELETE_REPORT.encode_call(&[string("1")]).is_err());
        let data = DELETE_REPORT.encode_call(&[uint(3)]).unwrap();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[..4], DELETE_REPORT.selector());
        assert_eq!(data[35], 3);
    }

    #[test]
    fn report_tuple_maps_positionally() {
        let reporter = "0x52908400098527886E0F7030069857D2E4169EE7";
        let report = Report {
            reporter: reporter.into(),
            reporter_name: "Ana".into(),
            email: "ana@example.org".into(),
            disaster_type: "Flood".into(),
            img_url: "https://ipfs.io/ipfs/Qm1".into(),
            latitude: "14.5995".into(),
            longitude: "120.9842".into(),
            city: "Manila".into(),
            state: "NCR".into(),
            date: "2024-07-24".into(),
            severity: "High".into(),
            impact: "Streets under a meter of water".into(),
        };
        let bytes = GET_REPORT.encode_output(&encode_report(&report).unwrap());
        let decoded = decode_report(&GET_REPORT.decode_output(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn short_report_tuple_is_rejected() {
        assert!(decode_report(&[string("x")]).is_err());
    }

    #[test]
    fn count_decodes_from_uint_word() {
        let bytes = GET_REPORT_LENGTH.encode_output(&[uint(42)]);
        let values = GET_REPORT_LENGTH.decode_output(&bytes).unwrap();
        assert_eq!(as_u64(&values[0]).unwrap(), 42);
    }
}
