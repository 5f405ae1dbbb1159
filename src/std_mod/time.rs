use std::time::{SystemTime, UNIX_EPOCH};

use crate::{objects::object::NativeObject, value::Value};

/// `clock()`: seconds since the Unix epoch, with sub-second precision.
#[derive(Debug, Default)]
pub struct ClockTime;

impl NativeObject for ClockTime {
    fn run(&self, _args: &[Value]) -> Result<Value, String> {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|error| format!("system clock is before the epoch: {error}"))?;
        Ok(Value::Number(duration.as_secs_f64()))
    }
}

impl ClockTime {
    pub fn new() -> Self {
        ClockTime
    }
}
