//! The variable context a template is rendered against.
//!
//! Three layers are merged, later ones winning on key collisions: system variables, configured
//! field values and data extracted from the CFDI.
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::BTreeMap;

/// Extra keys the CFDI layer exposes for some of its values.
pub const CFDI_ALIASES: &[(&str, &str)] = &[
    ("uuid", "cfdi_uuid"),
    ("fecha", "cfdi_fecha"),
    ("total", "cfdi_total"),
    ("subtotal", "cfdi_subtotal"),
    ("impuestos", "cfdi_impuestos"),
];

/// Key under which CFDI line items are exposed.
pub const CONCEPTOS: &str = "conceptos";

/// Renders a value the way it appears in a template: `null` as nothing, strings without quotes,
/// containers as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// An immutable lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableContext {
    values: BTreeMap<String, Value>,
}

impl VariableContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Walks objects by key and arrays by index. Any miss ends the walk.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.get(first.as_ref())?, |value, segment| {
            step(value, segment.as_ref())
        })
    }

    /// Like [`lookup`](Self::lookup), but a key that meets an array is applied to every item, and
    /// an array at the end of the path contributes its items.
    pub fn collect<S: AsRef<str>>(&self, path: &[S]) -> Vec<&Value> {
        let mut out = Vec::new();
        if let Some((first, rest)) = path.split_first() {
            if let Some(value) = self.get(first.as_ref()) {
                project(value, rest, &mut out);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn step<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn project<'v, S: AsRef<str>>(value: &'v Value, path: &[S], out: &mut Vec<&'v Value>) {
    let Some((segment, rest)) = path.split_first() else {
        match value {
            Value::Array(items) => out.extend(items.iter()),
            value => out.push(value),
        }
        return;
    };
    let segment = segment.as_ref();
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(segment) {
                project(next, rest, out);
            }
        }
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => {
                if let Some(next) = items.get(index) {
                    project(next, rest, out);
                }
            }
            Err(_) => {
                for item in items {
                    project(item, path, out);
                }
            }
        },
        _ => {}
    }
}

/// System variables derived from `now`.
pub fn system_variables(now: NaiveDateTime) -> BTreeMap<String, Value> {
    let mut vars = BTreeMap::new();
    let mut set = |key: &str, value: Value| {
        vars.insert(key.to_string(), value);
    };
    set("fecha_actual", now.format("%Y-%m-%d").to_string().into());
    set("hora_actual", now.format("%H:%M:%S").to_string().into());
    set("fecha_hora_actual", now.format("%Y-%m-%dT%H:%M:%S").to_string().into());
    set("anio_actual", now.format("%Y").to_string().into());
    set("mes_actual", now.format("%m").to_string().into());
    set("dia_actual", now.format("%d").to_string().into());
    set("timestamp", now.and_utc().timestamp().into());
    vars
}

/// Collects the three layers; [`build`](Self::build) merges them.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    system: BTreeMap<String, Value>,
    fields: BTreeMap<String, Value>,
    cfdi: BTreeMap<String, Value>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system_time(mut self, now: NaiveDateTime) -> Self {
        self.system.extend(system_variables(now));
        self
    }

    pub fn system(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.system.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn cfdi(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cfdi.insert(key.into(), value.into());
        self
    }

    /// Extracted CFDI data, flat.
    pub fn cfdi_data<K, V>(mut self, data: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.cfdi
            .extend(data.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Line items, reachable as `conceptos.0.importe` or `sum(conceptos.importe)`.
    pub fn conceptos(mut self, items: Value) -> Self {
        self.cfdi.insert(CONCEPTOS.to_string(), items);
        self
    }

    pub fn build(self) -> VariableContext {
        let mut values = self.system;
        values.extend(self.fields);

        let mut cfdi = self.cfdi;
        for (source, alias) in CFDI_ALIASES {
            match cfdi.get(*source) {
                Some(Value::Null) | None => {}
                Some(value) => {
                    let value = value.clone();
                    cfdi.insert(alias.to_string(), value);
                }
            }
        }
        values.extend(cfdi);

        tracing::trace!(variables = values.len(), "built variable context");
        VariableContext { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn cfdi_layer_wins() {
        let context = ContextBuilder::new()
            .system("x", "sys")
            .field("x", "field")
            .cfdi("x", "cfdi")
            .field("y", "field")
            .system("y", "sys")
            .build();
        assert_eq!(context.get("x"), Some(&json!("cfdi")));
        assert_eq!(context.get("y"), Some(&json!("field")));
    }

    #[test]
    fn aliases_only_for_present_values() {
        let context = ContextBuilder::new()
            .cfdi_data([("uuid", json!("ABC-123")), ("total", Value::Null)])
            .build();
        assert_eq!(context.get("cfdi_uuid"), Some(&json!("ABC-123")));
        assert_eq!(context.get("uuid"), Some(&json!("ABC-123")));
        assert_eq!(context.get("cfdi_total"), None);
        assert_eq!(context.get("cfdi_fecha"), None);
    }

    #[test]
    fn system_variables_from_explicit_time() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 9, 10)
            .unwrap();
        let context = ContextBuilder::new().system_time(now).build();
        assert_eq!(context.get("fecha_actual"), Some(&json!("2024-03-05")));
        assert_eq!(context.get("hora_actual"), Some(&json!("08:09:10")));
        assert_eq!(context.get("fecha_hora_actual"), Some(&json!("2024-03-05T08:09:10")));
        assert_eq!(context.get("mes_actual"), Some(&json!("03")));
        assert_eq!(context.get("timestamp"), Some(&json!(1709626150)));
    }

    #[test]
    fn paths_and_projections() {
        let context = ContextBuilder::new()
            .conceptos(json!([
                {"importe": "100.00", "impuestos": [{"importe": "16.00"}]},
                {"importe": "50.50", "impuestos": [{"importe": "8.08"}, {"importe": "1.00"}]},
            ]))
            .build();
        assert_eq!(
            context.lookup(&["conceptos", "1", "importe"]),
            Some(&json!("50.50"))
        );
        assert_eq!(context.lookup(&["conceptos", "importe"]), None);
        assert_eq!(context.lookup(&["conceptos", "7", "importe"]), None);
        assert_eq!(
            context.collect(&["conceptos", "impuestos", "importe"]),
            vec![&json!("16.00"), &json!("8.08"), &json!("1.00")]
        );
        assert_eq!(context.collect(&["conceptos"]).len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(1.5)), "1.5");
        assert_eq!(display_value(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
