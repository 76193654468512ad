use std::sync::Arc;

use dashmap::DashMap;

use super::BoundingBox;

/// Coordinate system id and precision grid shared by a schema's geometries.
///
/// A scale of `0` means floating precision; otherwise coordinates snap to
/// multiples of `1 / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryFactory {
    srid: u32,
    scale: f64,
}

impl GeometryFactory {
    pub fn new(srid: u32, scale: f64) -> Self {
        Self {
            srid,
            scale: normalize_scale(scale),
        }
    }

    pub fn floating(srid: u32) -> Self {
        Self::new(srid, 0.0)
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn is_floating(&self) -> bool {
        self.scale == 0.0
    }

    pub fn make_precise(&self, value: f64) -> f64 {
        if self.is_floating() {
            value
        } else {
            (value * self.scale).round() / self.scale
        }
    }

    /// Snaps a box outwards to the precision grid so it still covers the
    /// original extent.
    pub fn snap_bbox(&self, bbox: &BoundingBox) -> BoundingBox {
        match bbox.rect() {
            Some(rect) if !self.is_floating() => BoundingBox::new(
                (rect.min().x * self.scale).floor() / self.scale,
                (rect.min().y * self.scale).floor() / self.scale,
                (rect.max().x * self.scale).ceil() / self.scale,
                (rect.max().y * self.scale).ceil() / self.scale,
            ),
            _ => *bbox,
        }
    }
}

fn normalize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        0.0
    }
}

/// Factories keyed by (srid, scale).
///
/// Owned by whoever builds schemas and passed to them explicitly; two
/// first-time callers with the same key always receive the same instance.
#[derive(Debug, Default)]
pub struct GeometryFactoryCache {
    factories: DashMap<(u32, u64), Arc<GeometryFactory>>,
}

impl GeometryFactoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, srid: u32, scale: f64) -> Arc<GeometryFactory> {
        let scale = normalize_scale(scale);
        let entry = self
            .factories
            .entry((srid, scale.to_bits()))
            .or_insert_with(|| {
                log::debug!("Creating geometry factory srid={} scale={}", srid, scale);
                Arc::new(GeometryFactory::new(srid, scale))
            });
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
