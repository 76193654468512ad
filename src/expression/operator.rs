//! Operator and function definitions for query values.

use rust_decimal::Decimal;

/// Operators of a binary condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Like,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanEqual => ">=",
            ComparisonOperator::Like => "LIKE",
        }
    }

    /// Accepts `!=` as well as `<>`; case-insensitive for `LIKE`.
    pub fn from_sql(op: &str) -> Option<Self> {
        let op = match op.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => ComparisonOperator::Equal,
            "<>" | "!=" => ComparisonOperator::NotEqual,
            "<" => ComparisonOperator::LessThan,
            "<=" => ComparisonOperator::LessThanEqual,
            ">" => ComparisonOperator::GreaterThan,
            ">=" => ComparisonOperator::GreaterThanEqual,
            "LIKE" => ComparisonOperator::Like,
            _ => return None,
        };
        Some(op)
    }
}

/// Operators of a binary arithmetic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArithmeticOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
        }
    }

    pub fn from_sql(op: &str) -> Option<Self> {
        let op = match op.trim().to_ascii_uppercase().as_str() {
            "+" => ArithmeticOperator::Add,
            "-" => ArithmeticOperator::Subtract,
            "*" => ArithmeticOperator::Multiply,
            "/" => ArithmeticOperator::Divide,
            "%" | "MOD" => ArithmeticOperator::Modulo,
            _ => return None,
        };
        Some(op)
    }

    /// Binding strength; multiplicative operators bind tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            ArithmeticOperator::Add | ArithmeticOperator::Subtract => 5,
            ArithmeticOperator::Multiply | ArithmeticOperator::Divide | ArithmeticOperator::Modulo => 6,
        }
    }

    /// Exact result, `None` on overflow or a zero divisor.
    pub fn apply(&self, left: Decimal, right: Decimal) -> Option<Decimal> {
        match self {
            ArithmeticOperator::Add => left.checked_add(right),
            ArithmeticOperator::Subtract => left.checked_sub(right),
            ArithmeticOperator::Multiply => left.checked_mul(right),
            ArithmeticOperator::Divide => left.checked_div(right),
            ArithmeticOperator::Modulo => left.checked_rem(right),
        }
    }

    /// Floating-point result for operands outside the decimal range, `None`
    /// only for a zero divisor.
    pub fn apply_f64(&self, left: f64, right: f64) -> Option<f64> {
        match self {
            ArithmeticOperator::Add => Some(left + right),
            ArithmeticOperator::Subtract => Some(left - right),
            ArithmeticOperator::Multiply => Some(left * right),
            ArithmeticOperator::Divide | ArithmeticOperator::Modulo if right == 0.0 => None,
            ArithmeticOperator::Divide => Some(left / right),
            ArithmeticOperator::Modulo => Some(left % right),
        }
    }
}

/// Functions accepted in query values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Upper,
    Lower,
    EnvelopeIntersects,
    WithinDistance,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Upper => "UPPER",
            Function::Lower => "LOWER",
            Function::EnvelopeIntersects => "ENVELOPE_INTERSECTS",
            Function::WithinDistance => "WITHIN_DISTANCE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name.to_ascii_uppercase().replace('-', "_").as_str() {
            "UPPER" => Function::Upper,
            "LOWER" => Function::Lower,
            "ENVELOPE_INTERSECTS" => Function::EnvelopeIntersects,
            "WITHIN_DISTANCE" => Function::WithinDistance,
            _ => return None,
        };
        Some(function)
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Upper | Function::Lower => 1,
            Function::EnvelopeIntersects => 2,
            Function::WithinDistance => 3,
        }
    }

    /// Spatial predicates are boolean-valued and feed bounding-box extraction.
    pub fn is_spatial(&self) -> bool {
        matches!(self, Function::EnvelopeIntersects | Function::WithinDistance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_from_sql() {
        assert_eq!(ComparisonOperator::from_sql("!="), Some(ComparisonOperator::NotEqual));
        assert_eq!(ComparisonOperator::from_sql("like"), Some(ComparisonOperator::Like));
        assert_eq!(ComparisonOperator::from_sql("~"), None);
        assert_eq!(ComparisonOperator::NotEqual.as_str(), "<>");
    }

    #[test]
    fn test_arithmetic_apply() {
        let seven = Decimal::from(7);
        let two = Decimal::from(2);
        assert_eq!(ArithmeticOperator::Modulo.apply(seven, two), Some(Decimal::from(1)));
        assert_eq!(ArithmeticOperator::Divide.apply(seven, two), Some(Decimal::new(35, 1)));
        assert_eq!(ArithmeticOperator::Divide.apply(seven, Decimal::ZERO), None);
        assert!(ArithmeticOperator::Multiply.precedence() > ArithmeticOperator::Add.precedence());
    }

    #[test]
    fn test_arithmetic_apply_f64() {
        assert_eq!(ArithmeticOperator::Add.apply_f64(1e30, 1.0), Some(1e30));
        assert_eq!(ArithmeticOperator::Multiply.apply_f64(-2e30, 2.0), Some(-4e30));
        assert_eq!(ArithmeticOperator::Modulo.apply_f64(7.5, 2.0), Some(1.5));
        assert_eq!(ArithmeticOperator::Divide.apply_f64(1e30, 0.0), None);
        assert_eq!(ArithmeticOperator::Modulo.apply_f64(1e30, 0.0), None);
    }

    #[test]
    fn test_function_names() {
        assert_eq!(Function::from_name("envelope-intersects"), Some(Function::EnvelopeIntersects));
        assert_eq!(Function::from_name("upper"), Some(Function::Upper));
        assert_eq!(Function::from_name("SUBSTR"), None);
        assert_eq!(Function::WithinDistance.arity(), 3);
    }
}
