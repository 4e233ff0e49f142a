//! Earth Engine expression graphs.
//!
//! Earth Engine evaluates computations sent as serialized expression graphs.
//! This module provides a small typed builder over that format, covering the
//! algorithms the NDVI lookup needs. Building an expression never touches the
//! network; only [`EarthEngine::compute_value`](crate::EarthEngine::compute_value)
//! does.
//!
//! # Example
//!
//! ```
//! use ndvi::expr::{Expression, Filter, Geometry, ImageCollection};
//!
//! let point = Geometry::point(2.17, 41.39);
//! let image = ImageCollection::load("COPERNICUS/S2_SR_HARMONIZED")
//!     .filter_bounds(&point)
//!     .filter(Filter::lt("CLOUDY_PIXEL_PERCENTAGE", 10.0))
//!     .sort("system:time_start", false)
//!     .first();
//!
//! let expression = Expression::new(image.get("system:index"));
//! let json = serde_json::to_value(&expression).unwrap();
//! assert_eq!(json["result"], "0");
//! assert_eq!(
//!     json["values"]["0"]["functionInvocationValue"]["functionName"],
//!     "Element.get"
//! );
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// A node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValueNode {
    /// A literal JSON value.
    #[serde(rename = "constantValue")]
    Constant(Value),

    /// A list of nodes.
    #[serde(rename = "arrayValue")]
    Array { values: Vec<ValueNode> },

    /// A dictionary of nodes.
    #[serde(rename = "dictionaryValue")]
    Dictionary { values: BTreeMap<String, ValueNode> },

    /// A call to a server-side algorithm.
    #[serde(rename = "functionInvocationValue")]
    Invocation {
        #[serde(rename = "functionName")]
        function_name: String,
        arguments: BTreeMap<String, ValueNode>,
    },
}

impl ValueNode {
    /// Create a constant node.
    pub fn constant(value: impl Into<Value>) -> Self {
        ValueNode::Constant(value.into())
    }

    /// Create a call to the named algorithm.
    pub fn invoke<'a>(
        function_name: &str,
        arguments: impl IntoIterator<Item = (&'a str, ValueNode)>,
    ) -> Self {
        ValueNode::Invocation {
            function_name: function_name.to_string(),
            arguments: arguments
                .into_iter()
                .map(|(name, node)| (name.to_string(), node))
                .collect(),
        }
    }

    /// The algorithm name, if this node is an invocation.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::Invocation { function_name, .. } => Some(function_name),
            _ => None,
        }
    }

    /// A named argument, if this node is an invocation.
    pub fn argument(&self, name: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::Invocation { arguments, .. } => arguments.get(name),
            _ => None,
        }
    }
}

/// A complete expression ready to be sent for evaluation.
///
/// The graph is serialized with its root stored under the key `"0"`.
/// Sub-expressions are inlined rather than shared by reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    result: String,
    values: BTreeMap<String, ValueNode>,
}

impl Expression {
    const ROOT: &'static str = "0";

    /// Wrap a node (or anything convertible to one) as an expression.
    pub fn new(root: impl Into<ValueNode>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(Self::ROOT.to_string(), root.into());
        Self {
            result: Self::ROOT.to_string(),
            values,
        }
    }

    /// The root node of the graph.
    pub fn root(&self) -> &ValueNode {
        &self.values[&self.result]
    }
}

macro_rules! node_wrapper {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq)]
            pub struct $name(ValueNode);

            impl From<$name> for ValueNode {
                fn from(value: $name) -> Self {
                    value.0
                }
            }

            impl $name {
                /// The underlying graph node.
                pub fn node(&self) -> &ValueNode {
                    &self.0
                }
            }
        )*
    };
}

node_wrapper!(
    /// A server-side geometry.
    Geometry,
    /// A server-side image collection.
    ImageCollection,
    /// A server-side image.
    Image,
    /// A collection filter.
    Filter,
    /// A server-side date.
    EeDate,
    /// A reducer.
    Reducer,
    /// A server-side dictionary.
    Dictionary,
    /// Any other computed value (numbers, strings, properties).
    ComputedValue,
);

fn strings(items: &[&str]) -> ValueNode {
    ValueNode::constant(items.iter().map(|s| Value::from(*s)).collect::<Vec<_>>())
}

impl Geometry {
    /// `GeometryConstructors.Point` at `[lon, lat]`.
    pub fn point(lon: f64, lat: f64) -> Self {
        Self(ValueNode::invoke(
            "GeometryConstructors.Point",
            [("coordinates", ValueNode::constant(vec![lon, lat]))],
        ))
    }
}

impl ImageCollection {
    /// `ImageCollection.load` of a catalog asset id.
    pub fn load(id: &str) -> Self {
        Self(ValueNode::invoke(
            "ImageCollection.load",
            [("id", ValueNode::constant(id))],
        ))
    }

    /// Keep the elements matching `filter`.
    pub fn filter(self, filter: Filter) -> Self {
        Self(ValueNode::invoke(
            "Collection.filter",
            [("collection", self.0), ("filter", filter.0)],
        ))
    }

    /// Keep the images whose footprint intersects `geometry`.
    pub fn filter_bounds(self, geometry: &Geometry) -> Self {
        self.filter(Filter::bounds(geometry))
    }

    /// Keep the images acquired in `[start, end)`.
    pub fn filter_date(self, start: EeDate, end: EeDate) -> Self {
        self.filter(Filter::date(start, end))
    }

    /// Sort by a property. Earth Engine exposes sorting as an unbounded
    /// `Collection.limit`.
    pub fn sort(self, property: &str, ascending: bool) -> Self {
        Self(ValueNode::invoke(
            "Collection.limit",
            [
                ("collection", self.0),
                ("key", ValueNode::constant(property)),
                ("ascending", ValueNode::constant(ascending)),
            ],
        ))
    }

    /// The first image of the collection, null when empty.
    pub fn first(self) -> Image {
        Image(ValueNode::invoke("Collection.first", [("collection", self.0)]))
    }
}

impl Filter {
    /// Elements whose geometry intersects `geometry`.
    pub fn bounds(geometry: &Geometry) -> Self {
        let feature = ValueNode::invoke("Feature", [("geometry", geometry.0.clone())]);
        Self(ValueNode::invoke(
            "Filter.intersects",
            [
                ("leftField", ValueNode::constant(".all")),
                ("rightValue", feature),
            ],
        ))
    }

    /// Elements with `system:time_start` in `[start, end)`.
    pub fn date(start: EeDate, end: EeDate) -> Self {
        let range = ValueNode::invoke("DateRange", [("start", start.0), ("end", end.0)]);
        Self(ValueNode::invoke(
            "Filter.dateRangeContains",
            [
                ("leftValue", range),
                ("rightField", ValueNode::constant("system:time_start")),
            ],
        ))
    }

    /// Elements whose `property` is strictly less than `value`.
    pub fn lt(property: &str, value: f64) -> Self {
        Self(ValueNode::invoke(
            "Filter.lessThan",
            [
                ("leftField", ValueNode::constant(property)),
                ("rightValue", ValueNode::constant(value)),
            ],
        ))
    }
}

impl Image {
    /// A metadata property of the image.
    pub fn get(&self, property: &str) -> ComputedValue {
        ComputedValue(ValueNode::invoke(
            "Element.get",
            [
                ("object", self.0.clone()),
                ("property", ValueNode::constant(property)),
            ],
        ))
    }

    /// `(first - second) / (first + second)` over two bands.
    pub fn normalized_difference(&self, bands: [&str; 2]) -> Image {
        Image(ValueNode::invoke(
            "Image.normalizedDifference",
            [("input", self.0.clone()), ("bandNames", strings(&bands))],
        ))
    }

    /// Rename the bands of the image.
    pub fn rename(self, names: &[&str]) -> Image {
        Image(ValueNode::invoke(
            "Image.rename",
            [("input", self.0), ("names", strings(names))],
        ))
    }

    /// Apply `reducer` to the pixels under `geometry` sampled every `scale`
    /// meters. The result maps band names to reduced values.
    pub fn reduce_region(&self, reducer: Reducer, geometry: &Geometry, scale: f64) -> Dictionary {
        Dictionary(ValueNode::invoke(
            "Image.reduceRegion",
            [
                ("image", self.0.clone()),
                ("reducer", reducer.0),
                ("geometry", geometry.0.clone()),
                ("scale", ValueNode::constant(scale)),
            ],
        ))
    }
}

impl EeDate {
    /// A date from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self(ValueNode::invoke("Date", [("value", ValueNode::constant(millis))]))
    }

    /// A date from a computed value such as `system:time_start`.
    pub fn from_value(value: ComputedValue) -> Self {
        Self(ValueNode::invoke("Date", [("value", value.0)]))
    }

    /// Format the date with a Joda-style pattern (e.g. `YYYY-MM-dd`).
    pub fn format(self, pattern: &str) -> ComputedValue {
        ComputedValue(ValueNode::invoke(
            "Date.format",
            [("date", self.0), ("format", ValueNode::constant(pattern))],
        ))
    }
}

impl Reducer {
    /// Arithmetic mean.
    pub fn mean() -> Self {
        Self(ValueNode::Invocation {
            function_name: "Reducer.mean".to_string(),
            arguments: BTreeMap::new(),
        })
    }
}

impl Dictionary {
    /// A literal dictionary whose values are computed server-side.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, ValueNode)>) -> Self {
        Self(ValueNode::Dictionary {
            values: entries
                .into_iter()
                .map(|(key, node)| (key.to_string(), node))
                .collect(),
        })
    }

    /// The value stored under `key`.
    pub fn get(self, key: &str) -> ComputedValue {
        ComputedValue(ValueNode::invoke(
            "Dictionary.get",
            [("dictionary", self.0), ("key", ValueNode::constant(key))],
        ))
    }
}
