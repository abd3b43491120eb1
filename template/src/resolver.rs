use crate::{
    context::{display_value, VariableContext},
    error::ResolveError,
    expression::{Aggregate, Expression},
    format,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happens to a placeholder that cannot be resolved.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Substitute an empty string.
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Resolver {
    pub mode: ResolveMode,
}

impl Resolver {
    pub fn new(mode: ResolveMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(ResolveMode::Strict)
    }

    pub fn resolve(&self, expression: &str, context: &VariableContext) -> Result<String, ResolveError> {
        self.evaluate(&Expression::classify(expression), expression, context)
    }

    /// `source` is only used in error messages.
    pub fn evaluate(
        &self,
        expression: &Expression,
        source: &str,
        context: &VariableContext,
    ) -> Result<String, ResolveError> {
        match expression {
            Expression::Identifier(name) => match context.get(name) {
                Some(value) => Ok(display_value(value)),
                None => self.unresolved(source),
            },
            Expression::Path(path) => match context.lookup(path) {
                Some(value) => Ok(display_value(value)),
                None => self.unresolved(source),
            },
            Expression::Function { func, argument } => {
                Ok(aggregate(*func, &context.collect(argument)))
            }
            Expression::Formatted { base, format } => {
                let value = self.evaluate(base, source, context)?;
                Ok(format::apply(format, &value))
            }
            Expression::Invalid => match self.mode {
                ResolveMode::Lenient => {
                    tracing::warn!(expression = source, "invalid expression replaced by empty string");
                    Ok(String::new())
                }
                ResolveMode::Strict => Err(ResolveError::InvalidExpression(source.trim().to_string())),
            },
        }
    }

    fn unresolved(&self, source: &str) -> Result<String, ResolveError> {
        match self.mode {
            ResolveMode::Lenient => {
                tracing::debug!(expression = source, "unresolved variable replaced by empty string");
                Ok(String::new())
            }
            ResolveMode::Strict => Err(ResolveError::Unresolved(source.trim().to_string())),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Rounded to six decimals, without a fractional part when integral.
fn display_number(number: f64) -> String {
    let rounded = (number * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        rounded.to_string()
    }
}

fn aggregate(func: Aggregate, values: &[&Value]) -> String {
    let numbers = || values.iter().filter_map(|v| as_number(v));
    match func {
        Aggregate::Sum => display_number(numbers().sum()),
        Aggregate::Count => values.len().to_string(),
        Aggregate::Avg => {
            let (sum, count) = numbers().fold((0.0, 0usize), |(s, c), n| (s + n, c + 1));
            if count == 0 {
                String::new()
            } else {
                display_number(sum / count as f64)
            }
        }
        Aggregate::Max => numbers().reduce(f64::max).map(display_number).unwrap_or_default(),
        Aggregate::Min => numbers().reduce(f64::min).map(display_number).unwrap_or_default(),
        Aggregate::First => values.first().map(|v| display_value(v)).unwrap_or_default(),
        Aggregate::Last => values.last().map(|v| display_value(v)).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn context() -> VariableContext {
        ContextBuilder::new()
            .field("nombre", "juan pérez")
            .field("fecha", "2024-01-31T10:00:00")
            .field("activo", true)
            .field("monto", "1234.5")
            .conceptos(json!([
                {"descripcion": "Tornillo", "importe": "100.10"},
                {"descripcion": "Tuerca", "importe": "200.20"},
                {"descripcion": "Servicio", "importe": "n/a"},
            ]))
            .build()
    }

    fn lenient(expression: &str) -> String {
        Resolver::default().resolve(expression, &context()).unwrap()
    }

    #[test]
    fn identifiers() {
        assert_eq!(lenient("nombre"), "juan pérez");
        assert_eq!(lenient("activo"), "true");
        assert_eq!(lenient("missing"), "");
    }

    #[test]
    fn formatted() {
        assert_eq!(lenient("nombre | uppercase"), "JUAN PÉREZ");
        assert_eq!(lenient("nombre|title"), "Juan Pérez");
        assert_eq!(lenient("fecha | date:%d/%m/%Y"), "31/01/2024");
        assert_eq!(lenient("fecha | date"), "2024-01-31");
        assert_eq!(lenient("monto | number:1"), "1234.5");
        assert_eq!(lenient("monto | currency"), "$1,234.50");
        assert_eq!(lenient("missing | currency"), "");
    }

    #[test]
    fn paths() {
        assert_eq!(lenient("conceptos.1.descripcion"), "Tuerca");
        assert_eq!(lenient("conceptos.9.descripcion"), "");
        assert_eq!(lenient("nombre.first"), "");
    }

    #[test]
    fn aggregates() {
        assert_eq!(lenient("sum(conceptos.importe)"), "300.3");
        assert_eq!(lenient("count(conceptos)"), "3");
        assert_eq!(lenient("count(conceptos.importe)"), "3");
        assert_eq!(lenient("avg(conceptos.importe)"), "150.15");
        assert_eq!(lenient("max(conceptos.importe)"), "200.2");
        assert_eq!(lenient("min(conceptos.importe)"), "100.1");
        assert_eq!(lenient("first(conceptos.descripcion)"), "Tornillo");
        assert_eq!(lenient("last(conceptos.descripcion)"), "Servicio");
        assert_eq!(lenient("sum(nada)"), "0");
        assert_eq!(lenient("max(nada)"), "");
        assert_eq!(lenient("sum(conceptos.importe) | currency"), "$300.30");
    }

    #[test]
    fn invalid_expressions_are_empty_when_lenient() {
        assert_eq!(lenient("median(conceptos.importe)"), "");
        assert_eq!(lenient("a b c"), "");
    }

    #[test]
    fn strict_mode_fails() {
        let resolver = Resolver::strict();
        let context = context();
        assert_eq!(
            resolver.resolve(" missing ", &context),
            Err(ResolveError::Unresolved("missing".to_string()))
        );
        assert_eq!(
            resolver.resolve("a b", &context),
            Err(ResolveError::InvalidExpression("a b".to_string()))
        );
        assert_eq!(resolver.resolve("nombre", &context).unwrap(), "juan pérez");
    }
}
