//! Sample data for asymptotic-complexity charts.
//!
//! Recognised labels are generated locally from the closed-form growth
//! function plus bounded jitter. Unrecognised labels either default to linear
//! or, in strict mode, are delegated to the model fallback client.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::error::{LensError, Result};
use crate::fallback::{ModelBackend, ModelFallbackClient};
use crate::model::CurvePoint;
use crate::prompts;
use crate::util::{extract_json_array, normalize_operations, truncate_chars};

/// Largest exponent used for exponential curves.
pub const EXPONENT_CAP: u32 = 20;

/// Growth classes the local generator knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityClass {
    Constant,
    Logarithmic,
    Linear,
    Linearithmic,
    Quadratic,
    Cubic,
    Exponential,
}

/// Marker table, checked in order against the lower-cased label.
const MARKERS: &[(ComplexityClass, &[&str])] = &[
    (ComplexityClass::Constant, &["o(1)", "constant"]),
    (ComplexityClass::Logarithmic, &["o(log", "logarithmic"]),
    (ComplexityClass::Quadratic, &["o(n²)", "o(n^2)", "quadratic"]),
    (ComplexityClass::Cubic, &["o(n³)", "o(n^3)", "cubic"]),
    (ComplexityClass::Linearithmic, &["o(n log n)", "linearithmic"]),
    (ComplexityClass::Exponential, &["2^n", "exponential"]),
];

impl ComplexityClass {
    /// First class whose marker appears in `label`, if any.
    pub fn detect(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        MARKERS
            .iter()
            .find(|(_, markers)| markers.iter().any(|marker| label.contains(marker)))
            .map(|(class, _)| *class)
    }

    /// Noise-free value at input size `n`.
    pub fn base_value(self, n: u32) -> f64 {
        let x = f64::from(n);
        match self {
            Self::Constant => 1.0,
            Self::Logarithmic => x.log2(),
            Self::Linear => x,
            Self::Linearithmic => x * x.log2(),
            Self::Quadratic => x * x,
            Self::Cubic => x * x * x,
            Self::Exponential => 2f64.powi(n.min(EXPONENT_CAP) as i32),
        }
    }

    /// Half-width of the jitter window at input size `n`.
    pub fn jitter_amplitude(self, n: u32) -> f64 {
        let x = f64::from(n);
        match self {
            Self::Constant => 0.1,
            Self::Logarithmic | Self::Linear => 0.5,
            Self::Linearithmic => x / 4.0,
            Self::Quadratic => x / 2.0,
            Self::Cubic => x * x / 2.0,
            Self::Exponential => 5.0,
        }
    }
}

/// Source of bounded random perturbation.
pub trait Jitter {
    /// A value in `[-amplitude, amplitude]`.
    fn sample(&mut self, amplitude: f64) -> f64;
}

/// Uniform jitter drawn from any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngJitter<R>(R);

impl RngJitter<StdRng> {
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Jitter for RngJitter<R> {
    fn sample(&mut self, amplitude: f64) -> f64 {
        if amplitude <= 0.0 {
            return 0.0;
        }
        self.0.gen_range(-amplitude..=amplitude)
    }
}

/// How labels without a known marker are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMatching {
    /// Unmatched labels are charted as linear.
    #[default]
    DefaultLinear,
    /// Unmatched labels are sent to the model.
    Strict,
}

/// Closed-form curve for `class` with points `1..=count`.
pub fn generate<J: Jitter + ?Sized>(
    class: ComplexityClass,
    count: u32,
    jitter: &mut J,
) -> Vec<CurvePoint> {
    (1..=count)
        .map(|n| {
            let value = class.base_value(n) + jitter.sample(class.jitter_amplitude(n));
            CurvePoint {
                input_size: n,
                operations: normalize_operations(value),
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    input_size: f64,
    operations: f64,
}

/// Parses a model answer into a curve of exactly `count` points.
pub fn parse_model_curve(text: &str, count: u32) -> Result<Vec<CurvePoint>> {
    let array = extract_json_array(text).ok_or_else(|| {
        LensError::CurveGeneration(format!(
            "no JSON array in model response: {}",
            truncate_chars(text.trim(), 200)
        ))
    })?;

    let raw: Vec<RawPoint> = serde_json::from_str(array)
        .map_err(|err| LensError::CurveGeneration(format!("invalid curve JSON: {err}")))?;

    if raw.len() != count as usize {
        return Err(LensError::CurveGeneration(format!(
            "expected {count} points, model returned {}",
            raw.len()
        )));
    }

    raw.into_iter()
        .zip(1..=count)
        .map(|(point, expected)| {
            if point.input_size != f64::from(expected) {
                return Err(LensError::CurveGeneration(format!(
                    "point {expected} has input_size {}",
                    point.input_size
                )));
            }
            if !point.operations.is_finite() {
                return Err(LensError::CurveGeneration(format!(
                    "point {expected} has non-finite operations"
                )));
            }
            Ok(CurvePoint {
                input_size: expected,
                operations: normalize_operations(point.operations),
            })
        })
        .collect()
}

/// Resolves complexity labels to curves, local generation first.
#[derive(Debug)]
pub struct CurveResolver<B> {
    client: Arc<ModelFallbackClient<B>>,
}

impl<B> Clone for CurveResolver<B> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<B: ModelBackend> CurveResolver<B> {
    pub fn new(client: Arc<ModelFallbackClient<B>>) -> Self {
        Self { client }
    }

    pub async fn resolve<J: Jitter + Send + ?Sized>(
        &self,
        label: &str,
        count: u32,
        matching: LabelMatching,
        jitter: &mut J,
    ) -> Result<Vec<CurvePoint>> {
        let label = label.trim();
        if label.is_empty() {
            return Err(LensError::InvalidInput("complexity label is required".to_owned()));
        }
        if count == 0 {
            return Err(LensError::InvalidInput(
                "sample count must be positive".to_owned(),
            ));
        }

        let class = match (ComplexityClass::detect(label), matching) {
            (Some(class), _) => Some(class),
            (None, LabelMatching::DefaultLinear) => Some(ComplexityClass::Linear),
            (None, LabelMatching::Strict) => None,
        };
        if let Some(class) = class {
            tracing::debug!("generating {count} points for `{label}` as {class:?}");
            return Ok(generate(class, count, jitter));
        }

        self.client.ensure_ready()?;
        tracing::info!("no closed form for `{label}`, asking the model for {count} points");

        let answer = self
            .client
            .send(&prompts::curve(label, count))
            .await
            .map_err(|err| match err {
                LensError::Configuration(_) => err,
                other => LensError::CurveGeneration(other.to_string()),
            })?;
        parse_model_curve(&answer, count)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::fallback::test_support::{models, overloaded, ScriptedBackend};
    use crate::fallback::UpstreamError;

    /// Always returns the same fraction of the amplitude.
    struct Fixed(f64);

    impl Jitter for Fixed {
        fn sample(&mut self, amplitude: f64) -> f64 {
            amplitude * self.0
        }
    }

    fn resolver(backend: ScriptedBackend) -> CurveResolver<ScriptedBackend> {
        CurveResolver::new(Arc::new(ModelFallbackClient::new(
            backend,
            models(&["m1", "m2"]),
        )))
    }

    fn assert_contiguous(curve: &[CurvePoint], count: u32) {
        assert_eq!(curve.len(), count as usize);
        for (index, point) in curve.iter().enumerate() {
            assert_eq!(point.input_size, index as u32 + 1);
        }
    }

    fn assert_normalized(curve: &[CurvePoint]) {
        for point in curve {
            assert!(point.operations >= 1.0, "{point:?} below floor");
            assert_eq!(
                (point.operations * 100.0).round() / 100.0,
                point.operations,
                "{point:?} has more than two decimals"
            );
        }
    }

    #[test]
    fn detects_classes_in_priority_order() {
        let cases = [
            ("O(1)", ComplexityClass::Constant),
            ("constant time", ComplexityClass::Constant),
            ("O(log n)", ComplexityClass::Logarithmic),
            ("O(n²)", ComplexityClass::Quadratic),
            ("O(N^2)", ComplexityClass::Quadratic),
            ("Cubic", ComplexityClass::Cubic),
            ("O(n^3)", ComplexityClass::Cubic),
            ("O(n log n)", ComplexityClass::Linearithmic),
            ("O(2^n)", ComplexityClass::Exponential),
            ("exponential", ComplexityClass::Exponential),
        ];
        for (label, class) in cases {
            assert_eq!(ComplexityClass::detect(label), Some(class), "{label}");
        }
    }

    #[test]
    fn unknown_labels_are_not_detected() {
        assert_eq!(ComplexityClass::detect("O(n)"), None);
        assert_eq!(ComplexityClass::detect("O(n!)"), None);
        assert_eq!(ComplexityClass::detect("O(sqrt n)"), None);
    }

    #[test]
    fn quadratic_curve_stays_within_jitter() {
        let mut jitter = RngJitter::seeded(7);
        let curve = generate(ComplexityClass::Quadratic, 50, &mut jitter);

        assert_contiguous(&curve, 50);
        assert_normalized(&curve);
        assert!((curve[49].operations - 2500.0).abs() <= 25.0);
    }

    #[test]
    fn jitter_extremes_hit_the_bounds() {
        let high = generate(ComplexityClass::Quadratic, 50, &mut Fixed(1.0));
        let low = generate(ComplexityClass::Quadratic, 50, &mut Fixed(-1.0));
        assert_eq!(high[49].operations, 2525.0);
        assert_eq!(low[49].operations, 2475.0);

        let cubic = generate(ComplexityClass::Cubic, 10, &mut Fixed(1.0));
        assert_eq!(cubic[9].operations, 1050.0);

        let linearithmic = generate(ComplexityClass::Linearithmic, 8, &mut Fixed(0.0));
        assert_eq!(linearithmic[7].operations, 24.0);
    }

    #[test]
    fn constant_curve_stays_near_one() {
        let mut jitter = RngJitter::seeded(11);
        let curve = generate(ComplexityClass::Constant, 10, &mut jitter);

        assert_contiguous(&curve, 10);
        for point in &curve {
            assert!((0.9..=1.1).contains(&point.operations), "{point:?}");
        }
    }

    #[test]
    fn exponential_growth_is_capped() {
        let curve = generate(ComplexityClass::Exponential, 30, &mut Fixed(0.0));

        assert_eq!(curve[9].operations, 1024.0);
        assert_eq!(curve[19].operations, 1_048_576.0);
        for point in &curve[20..] {
            assert_eq!(point.operations, 1_048_576.0, "{point:?}");
        }
    }

    #[test]
    fn logarithmic_start_is_floored() {
        let curve = generate(ComplexityClass::Logarithmic, 4, &mut Fixed(-1.0));
        assert_eq!(curve[0].operations, 1.0);
        assert_eq!(curve[3].operations, 1.5);
    }

    #[test]
    fn every_class_emits_normalized_points() {
        let mut jitter = RngJitter::seeded(42);
        for class in [
            ComplexityClass::Constant,
            ComplexityClass::Logarithmic,
            ComplexityClass::Linear,
            ComplexityClass::Linearithmic,
            ComplexityClass::Quadratic,
            ComplexityClass::Cubic,
            ComplexityClass::Exponential,
        ] {
            let curve = generate(class, 40, &mut jitter);
            assert_contiguous(&curve, 40);
            assert_normalized(&curve);
        }
    }

    #[tokio::test]
    async fn resolve_uses_closed_form_without_calling_the_model() {
        let resolver = resolver(ScriptedBackend::default());
        let mut jitter = RngJitter::seeded(3);

        let curve = resolver
            .resolve("O(n^2)", 50, LabelMatching::Strict, &mut jitter)
            .await
            .unwrap();

        assert_contiguous(&curve, 50);
        assert!((curve[49].operations - 2500.0).abs() <= 25.0);
        assert!(resolver.client.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn resolve_defaults_unknown_labels_to_linear() {
        let resolver = resolver(ScriptedBackend::unready());

        let curve = resolver
            .resolve("O(n)", 5, LabelMatching::DefaultLinear, &mut Fixed(0.0))
            .await
            .unwrap();

        let values: Vec<f64> = curve.iter().map(|point| point.operations).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[tokio::test]
    async fn strict_mode_delegates_to_the_model() {
        let answer = "Sure! Here is the data:\n```json\n[\
            {\"input_size\":1,\"operations\":5},\
            {\"input_size\":2,\"operations\":0.25},\
            {\"input_size\":3,\"operations\":12.3456}\
        ]\n```";
        let resolver = resolver(ScriptedBackend::new(vec![Ok(answer.to_owned())]));

        let curve = resolver
            .resolve("O(n!)", 3, LabelMatching::Strict, &mut Fixed(0.0))
            .await
            .unwrap();

        assert_eq!(
            curve,
            vec![
                CurvePoint { input_size: 1, operations: 5.0 },
                CurvePoint { input_size: 2, operations: 1.0 },
                CurvePoint { input_size: 3, operations: 12.35 },
            ]
        );
        let calls = resolver.client.backend().calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("O(n!)"));
        assert!(calls[0].1.contains("exactly 3"));
    }

    #[tokio::test]
    async fn strict_mode_survives_model_fallback() {
        let answer = "[{\"input_size\":1,\"operations\":2},{\"input_size\":2,\"operations\":4}]";
        let resolver = resolver(ScriptedBackend::new(vec![overloaded(), Ok(answer.to_owned())]));

        let curve = resolver
            .resolve("O(sqrt n)", 2, LabelMatching::Strict, &mut Fixed(0.0))
            .await
            .unwrap();

        assert_eq!(curve.len(), 2);
        assert_eq!(resolver.client.backend().called_models(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn answer_without_array_is_a_generation_error() {
        let resolver = resolver(ScriptedBackend::new(vec![Ok(
            "I cannot produce that data.".to_owned()
        )]));

        let err = resolver
            .resolve("O(n!)", 3, LabelMatching::Strict, &mut Fixed(0.0))
            .await
            .unwrap_err();

        assert_matches!(err, LensError::CurveGeneration(ref message) if message.contains("no JSON array"));
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() {
        let resolver = resolver(ScriptedBackend::new(vec![Err(UpstreamError::new(
            Some(401),
            "API key not valid",
        ))]));

        let err = resolver
            .resolve("O(n!)", 3, LabelMatching::Strict, &mut Fixed(0.0))
            .await
            .unwrap_err();

        assert_matches!(err, LensError::CurveGeneration(ref message) if message.contains("API key not valid"));
    }

    #[tokio::test]
    async fn strict_mode_without_credentials_is_a_configuration_error() {
        let resolver = resolver(ScriptedBackend::unready());

        let err = resolver
            .resolve("O(n!)", 3, LabelMatching::Strict, &mut Fixed(0.0))
            .await
            .unwrap_err();

        assert_matches!(err, LensError::Configuration(_));
        assert!(resolver.client.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_label_and_zero_count() {
        let resolver = resolver(ScriptedBackend::default());

        let err = resolver
            .resolve("  ", 3, LabelMatching::DefaultLinear, &mut Fixed(0.0))
            .await
            .unwrap_err();
        assert_matches!(err, LensError::InvalidInput(_));

        let err = resolver
            .resolve("O(n)", 0, LabelMatching::DefaultLinear, &mut Fixed(0.0))
            .await
            .unwrap_err();
        assert_matches!(err, LensError::InvalidInput(_));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = parse_model_curve("[{\"input_size\":1,\"operations\":1}]", 2).unwrap_err();
        assert_matches!(err, LensError::CurveGeneration(ref message) if message.contains("expected 2"));
    }

    #[test]
    fn parse_rejects_gaps_in_input_size() {
        let text = "[{\"input_size\":1,\"operations\":1},{\"input_size\":3,\"operations\":9}]";
        assert_matches!(parse_model_curve(text, 2), Err(LensError::CurveGeneration(_)));
    }

    #[test]
    fn parse_accepts_float_input_sizes() {
        let text = "[{\"input_size\":1.0,\"operations\":3.333},{\"input_size\":2.0,\"operations\":7}]";
        let curve = parse_model_curve(text, 2).unwrap();
        assert_eq!(curve[0].operations, 3.33);
        assert_eq!(curve[1].input_size, 2);
    }

    #[test]
    fn parse_rejects_broken_json() {
        let text = "[{\"input_size\":1,\"operations\":}]";
        assert_matches!(parse_model_curve(text, 1), Err(LensError::CurveGeneration(ref message)) if message.starts_with("invalid curve JSON"));
    }
}
