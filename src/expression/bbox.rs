//! Bounding-box extraction used as a spatial pre-filter hint.

use super::node::QueryValue;
use super::operator::Function;
use crate::geometry::BoundingBox;
use crate::types::Value;

impl QueryValue {
    /// Union of the extents of every spatial predicate's literal operands,
    /// with `WITHIN_DISTANCE` extents grown by its distance.
    ///
    /// `None` when the tree has no spatial predicate, as opposed to
    /// `Some` of an empty box when the predicates have no literal extent.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox = BoundingBox::empty();
        self.collect_bounding_box(&mut bbox).then_some(bbox)
    }

    fn collect_bounding_box(&self, bbox: &mut BoundingBox) -> bool {
        match self {
            QueryValue::Function {
                function: Function::EnvelopeIntersects,
                arguments,
            } => {
                for argument in arguments {
                    bbox.add_bbox(&operand_extent(argument));
                }
                true
            }
            QueryValue::Function {
                function: Function::WithinDistance,
                arguments,
            } => {
                if let [first, second, distance] = arguments.as_slice() {
                    let mut within = operand_extent(first);
                    within.add_bbox(&operand_extent(second));
                    let distance = match distance.as_ref() {
                        QueryValue::Value(literal) => literal.value().to_f64().unwrap_or(0.0),
                        _ => 0.0,
                    };
                    bbox.add_bbox(&within.expand_delta(distance));
                }
                true
            }
            QueryValue::Value(literal) if matches!(literal.value(), Value::BoundingBox(_)) => {
                bbox.add_bbox(&BoundingBox::from_value(literal.value()));
                true
            }
            other => {
                let mut found = false;
                for child in other.query_values() {
                    found |= child.collect_bounding_box(bbox);
                }
                found
            }
        }
    }
}

fn operand_extent(operand: &QueryValue) -> BoundingBox {
    match operand {
        QueryValue::Value(literal) => BoundingBox::from_value(literal.value()),
        QueryValue::Parenthesis(inner) => operand_extent(inner),
        _ => BoundingBox::empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::node::{Column, Literal, QueryValueRef};
    use crate::expression::operator::ComparisonOperator;
    use geo::{point, Geometry};
    use std::sync::Arc;

    fn literal(value: impl Into<Value>) -> QueryValueRef {
        Arc::new(QueryValue::Value(Literal::new(value)))
    }

    fn geometry_column() -> QueryValueRef {
        Arc::new(QueryValue::Column(Column::new("geometry")))
    }

    fn intersects(bbox: BoundingBox) -> QueryValueRef {
        Arc::new(QueryValue::Function {
            function: Function::EnvelopeIntersects,
            arguments: vec![geometry_column(), literal(bbox)],
        })
    }

    #[test]
    fn test_no_spatial_predicate() {
        let tree = QueryValue::Binary {
            left: Arc::new(QueryValue::Column(Column::new("age"))),
            operator: ComparisonOperator::Equal,
            right: literal(30),
        };
        assert_eq!(tree.bounding_box(), None);
    }

    #[test]
    fn test_union_of_nested_predicates() {
        let tree = QueryValue::Or(vec![
            intersects(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            Arc::new(QueryValue::And(vec![intersects(BoundingBox::new(4.0, 4.0, 5.0, 6.0))])),
        ]);
        assert_eq!(tree.bounding_box(), Some(BoundingBox::new(0.0, 0.0, 5.0, 6.0)));
    }

    #[test]
    fn test_within_distance_expands() {
        let point: Geometry<f64> = point!(x: 100.0, y: 200.0).into();
        let tree = QueryValue::Function {
            function: Function::WithinDistance,
            arguments: vec![geometry_column(), literal(point), literal(10)],
        };
        assert_eq!(tree.bounding_box(), Some(BoundingBox::new(90.0, 190.0, 110.0, 210.0)));
    }

    #[test]
    fn test_predicate_without_literal_extent_is_empty_box() {
        let tree = QueryValue::Function {
            function: Function::EnvelopeIntersects,
            arguments: vec![geometry_column(), geometry_column()],
        };
        let bbox = tree.bounding_box().unwrap();
        assert!(bbox.is_empty());
    }
}
