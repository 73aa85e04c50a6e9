//! 관측 수집 (ingestion) 검증.
//!
//! 통합 스캔이 시작되기 전에 배치 전체를 검증하고 timestamp 순으로 정렬한다.
//! 레코드 하나라도 형식이 잘못되면 배치 전체를 거부하므로,
//! 일부만 통합된 타임라인이 만들어지는 일은 없다.

use replay_core::error::CoreError;
use replay_core::models::observation::{EventKind, Observation, TargetElement, NO_DETAIL};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// JSON 배열 문자열에서 관측 목록 수집
pub fn ingest_json(json: &str) -> Result<Vec<Observation>, CoreError> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(records) => ingest_records(&records),
        other => Err(CoreError::Validation {
            field: "observations".to_string(),
            message: format!("JSON 배열이 필요함 (받은 값: {})", json_type_name(&other)),
        }),
    }
}

/// 미가공 JSON 레코드 목록 검증 → 정렬된 관측 목록
pub fn ingest_records(records: &[Value]) -> Result<Vec<Observation>, CoreError> {
    let observations = records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, record))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sort_by_timestamp(observations))
}

/// 이미 타입이 있는 관측 목록 검증 → 정렬
///
/// 관측기들이 병렬로 만든 결과를 합친 직후 호출한다.
pub fn prepare(observations: Vec<Observation>) -> Result<Vec<Observation>, CoreError> {
    for (index, obs) in observations.iter().enumerate() {
        validate_timestamp(index, obs.timestamp)?;
    }
    Ok(sort_by_timestamp(observations))
}

/// timestamp 기준 안정 정렬 (같은 시각은 입력 순서 유지)
fn sort_by_timestamp(mut observations: Vec<Observation>) -> Vec<Observation> {
    observations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    debug!(count = observations.len(), "관측 수집 완료");
    observations
}

fn validate_timestamp(index: usize, timestamp: f64) -> Result<(), CoreError> {
    if !timestamp.is_finite() {
        return Err(malformed(index, format!("timestamp가 유한하지 않음: {timestamp}")));
    }
    if timestamp < 0.0 {
        return Err(malformed(index, format!("timestamp가 음수: {timestamp}")));
    }
    Ok(())
}

fn parse_record(index: usize, record: &Value) -> Result<Observation, CoreError> {
    let object = record
        .as_object()
        .ok_or_else(|| malformed(index, format!("객체가 아님: {}", json_type_name(record))))?;

    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => return Err(malformed(index, "timestamp 누락".to_string())),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| malformed(index, format!("timestamp가 숫자가 아님: {v}")))?,
    };
    validate_timestamp(index, timestamp)?;

    let kind: EventKind = match object.get("eventType") {
        None | Some(Value::Null) => return Err(malformed(index, "eventType 누락".to_string())),
        Some(Value::String(s)) => s
            .parse::<EventKind>()
            .map_err(|e| malformed(index, e.to_string()))?,
        Some(v) => return Err(malformed(index, format!("eventType이 문자열이 아님: {v}"))),
    };

    let value = match object.get("value") {
        None | Some(Value::Null) => NO_DETAIL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => return Err(malformed(index, format!("value가 문자열이 아님: {v}"))),
    };

    let target_element = match object.get("targetElement") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            serde_json::from_value::<TargetElement>(v.clone())
                .map_err(|e| malformed(index, format!("targetElement 형식 오류: {e}")))?,
        ),
    };

    let screenshot = match object.get("screenshot") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(PathBuf::from(s)),
        Some(v) => return Err(malformed(index, format!("screenshot이 문자열이 아님: {v}"))),
    };

    Ok(Observation {
        timestamp,
        kind,
        value,
        target_element,
        screenshot,
    })
}

fn malformed(index: usize, reason: String) -> CoreError {
    CoreError::MalformedObservation { index, reason }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
