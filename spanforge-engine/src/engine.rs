//! The trace generation engine.
//!
//! One engine is shared by every worker. Per trace it selects a scenario
//! by weight, resolves the scenario vars, then walks the span tree:
//! children run serially in declaration order inside the parent's
//! duration envelope, and every span reaches the exporter only after all
//! of its descendants have been finalised.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use spanforge_core::{
    now_nanos, AttributeValue, SpanEvent, SpanId, SpanLink, SpanRecord, SpanStatus, TraceId,
};
use spanforge_export::SpanExporter;
use spanforge_scenario::{Env, ErrorCondition, ScenarioSet, SpanNode, ValueResolver};
use spanforge_store::{TraceRecord, TraceStore};

use crate::context::ContextStore;
use crate::error::{EngineError, TraceError};
use crate::select::ScenarioSelector;

pub struct TraceEngine {
    scenarios: Arc<ScenarioSet>,
    selector: ScenarioSelector,
    resolver: ValueResolver,
    exporter: Arc<dyn SpanExporter>,
    context_store: Arc<ContextStore>,
    trace_store: Option<Arc<dyn TraceStore>>,
}

impl TraceEngine {
    pub fn new(
        scenarios: Arc<ScenarioSet>,
        exporter: Arc<dyn SpanExporter>,
        context_store: Arc<ContextStore>,
        max_template_iterations: usize,
    ) -> Result<Self, EngineError> {
        let selector = ScenarioSelector::new(&scenarios.scenarios)?;
        Ok(Self {
            scenarios,
            selector,
            resolver: ValueResolver::new(max_template_iterations),
            exporter,
            context_store,
            trace_store: None,
        })
    }

    /// Also persist each completed trace to the given store.
    #[must_use]
    pub fn with_trace_store(mut self, store: Arc<dyn TraceStore>) -> Self {
        self.trace_store = Some(store);
        self
    }

    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Generate and emit one complete trace.
    ///
    /// A template or exporter failure abandons the trace; whatever spans
    /// were already handed off stay exported, and nothing is retried.
    pub async fn generate_trace(&self, rng: &mut StdRng) -> Result<TraceId, TraceError> {
        let scenario = &self.scenarios.scenarios[self.selector.pick(rng)];
        let trace_id = TraceId::from_rng(rng);
        let vars = self.resolver.resolve_vars(&scenario.vars, rng)?;
        debug!(scenario = %scenario.name, trace_id = %trace_id, "generating trace");

        let mut spans = Vec::new();
        self.emit_span(&scenario.root, &vars, trace_id, None, None, rng, &mut spans)
            .await?;

        if let Some(store) = &self.trace_store {
            if let Some(record) = TraceRecord::from_spans(trace_id, spans) {
                if let Err(e) = store.add(record).await {
                    // The spans are already exported; persistence is a
                    // secondary sink and must not fail the trace.
                    warn!(trace_id = %trace_id, error = %e, "failed to persist trace record");
                }
            }
        }

        Ok(trace_id)
    }

    /// Emit one span and, recursively, its subtree. Returns the span's
    /// final end timestamp so the parent can extend its own envelope.
    #[allow(clippy::too_many_arguments)]
    fn emit_span<'a>(
        &'a self,
        node: &'a SpanNode,
        vars: &'a BTreeMap<String, String>,
        trace_id: TraceId,
        parent_span_id: Option<SpanId>,
        parent_attributes: Option<&'a BTreeMap<String, AttributeValue>>,
        rng: &'a mut StdRng,
        out: &'a mut Vec<SpanRecord>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TraceError>> + Send + 'a>> {
        Box::pin(async move {
            let span_id = SpanId::from_rng(rng);

            // The export key resolves before the attributes so that
            // `context_key` is usable inside them.
            let base_env = Env {
                vars: Some(vars),
                parent_attributes,
                own_attributes: None,
                context_key: None,
            };
            let export_key = match &node.export_context_as {
                Some(template) => Some(self.resolver.resolve(template, &base_env, rng)?),
                None => None,
            };
            let env = Env {
                context_key: export_key.as_deref(),
                ..base_env
            };

            let name = self.resolver.resolve(&node.operation, &env, rng)?;

            let mut attributes = BTreeMap::new();
            for (key, template) in &node.attributes {
                attributes.insert(
                    key.clone(),
                    self.resolver.resolve_attr(template, &env, rng)?,
                );
            }

            let links: Vec<SpanLink> = match &node.link_from_context {
                Some(pattern) => self
                    .context_store
                    .find(pattern)
                    .into_iter()
                    .map(|entry| SpanLink {
                        trace_id: entry.trace_id,
                        span_id: entry.span_id,
                    })
                    .collect(),
                None => Vec::new(),
            };

            let start_time_ns = now_nanos();

            let fired = roll_error(&node.error_conditions, rng).cloned();

            if let Some(key) = &export_key {
                self.context_store.insert(key.clone(), trace_id, span_id);
                debug!(key = %key, trace_id = %trace_id, "exported span context");
            }

            let (lo, hi) = node.delay_ms;
            let sampled_ms = if lo == hi { lo } else { rng.gen_range(lo..=hi) };
            let sampled_ns = sampled_ms.saturating_mul(1_000_000);

            // Declared events, spaced evenly over the span's own duration
            // unless they carry an explicit offset.
            let event_env = Env {
                own_attributes: Some(&attributes),
                ..env
            };
            let declared = node.events.len() as u64;
            let mut events = Vec::with_capacity(node.events.len());
            for (i, spec) in node.events.iter().enumerate() {
                let event_name = self.resolver.resolve(&spec.name, &event_env, rng)?;
                let mut event_attributes = BTreeMap::new();
                for (key, template) in &spec.attributes {
                    event_attributes.insert(
                        key.clone(),
                        self.resolver.resolve_attr(template, &event_env, rng)?,
                    );
                }
                let time_ns = match spec.offset_ms {
                    Some(offset) => start_time_ns + offset.saturating_mul(1_000_000),
                    None => start_time_ns + sampled_ns * (i as u64 + 1) / (declared + 1),
                };
                events.push(SpanEvent {
                    name: event_name,
                    time_ns,
                    attributes: event_attributes,
                });
            }

            // The span's own work is a real sleep: downstream collectors
            // index by real timestamps.
            if sampled_ms > 0 {
                tokio::time::sleep(Duration::from_millis(sampled_ms)).await;
            }

            // Children run serially in declaration order. A fired error
            // condition does not stop the walk; the emitted trace stays
            // structurally complete.
            let mut last_child_end = 0u64;
            for child in &node.calls {
                let child_end = self
                    .emit_span(
                        child,
                        vars,
                        trace_id,
                        Some(span_id),
                        Some(&attributes),
                        rng,
                        out,
                    )
                    .await?;
                last_child_end = last_child_end.max(child_end);
            }

            let end_time_ns = (start_time_ns + sampled_ns).max(last_child_end);

            // Events always land inside the span.
            for event in &mut events {
                event.time_ns = event.time_ns.min(end_time_ns);
            }

            let status = match fired {
                Some(condition) => {
                    events.push(exception_event(&condition, start_time_ns + sampled_ns));
                    debug!(
                        error_type = %condition.error_type,
                        probability = condition.probability,
                        "error condition fired"
                    );
                    SpanStatus::Error {
                        message: condition.message.clone(),
                    }
                }
                None => SpanStatus::Ok,
            };

            let record = SpanRecord {
                trace_id,
                span_id,
                parent_span_id,
                name,
                kind: node.kind,
                service: node.service.clone(),
                start_time_ns,
                end_time_ns,
                attributes,
                events,
                links,
                status,
            };

            // Hand off only after every descendant is finalised.
            self.exporter.export(record.clone()).await?;
            out.push(record);

            Ok(end_time_ns)
        })
    }
}

/// One roulette roll per span: the conditions partition `[1, 100]` in
/// declared order, so at most one fires and each fires with exactly its
/// declared probability.
fn roll_error<'a>(
    conditions: &'a [ErrorCondition],
    rng: &mut StdRng,
) -> Option<&'a ErrorCondition> {
    if conditions.is_empty() {
        return None;
    }
    let roll: u32 = rng.gen_range(1..=100);
    let mut cumulative = 0u32;
    for condition in conditions {
        cumulative += u32::from(condition.probability);
        if roll <= cumulative {
            return Some(condition);
        }
    }
    None
}

fn exception_event(condition: &ErrorCondition, time_ns: u64) -> SpanEvent {
    SpanEvent {
        name: "exception".to_owned(),
        time_ns,
        attributes: BTreeMap::from([
            (
                "exception.type".to_owned(),
                AttributeValue::String(condition.error_type.clone()),
            ),
            (
                "exception.message".to_owned(),
                AttributeValue::String(condition.message.clone()),
            ),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use spanforge_core::SpanKind;
    use spanforge_export::{FailureMode, RecordingSpanExporter};
    use spanforge_scenario::{AttrTemplate, EventSpec, Scenario, Template};
    use spanforge_store::InMemoryTraceStore;

    use super::*;

    fn leaf(operation: &str) -> SpanNode {
        SpanNode {
            service: "svc".to_owned(),
            operation: Template::compile(operation).unwrap(),
            kind: SpanKind::Internal,
            delay_ms: (0, 0),
            attributes: Vec::new(),
            events: Vec::new(),
            error_conditions: Vec::new(),
            export_context_as: None,
            link_from_context: None,
            calls: Vec::new(),
        }
    }

    fn scenario_of(root: SpanNode) -> Arc<ScenarioSet> {
        Arc::new(ScenarioSet {
            schema_version: 1,
            services: vec!["svc".to_owned()],
            scenarios: vec![Scenario {
                name: "test".to_owned(),
                weight: 1,
                vars: Vec::new(),
                root,
            }],
        })
    }

    fn engine_with(
        scenarios: Arc<ScenarioSet>,
        exporter: Arc<RecordingSpanExporter>,
        context_store: Arc<ContextStore>,
    ) -> TraceEngine {
        TraceEngine::new(scenarios, exporter, context_store, 10).unwrap()
    }

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[tokio::test]
    async fn single_span_has_exact_sampled_duration() {
        let mut root = leaf("lone-op");
        root.delay_ms = (10, 10);

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(1)).await.unwrap();

        let spans = exporter.spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.duration_ns(), 10_000_000);
        assert_eq!(span.status, SpanStatus::Ok);
        assert!(span.parent_span_id.is_none());
        assert_eq!(span.name, "lone-op");
    }

    #[tokio::test]
    async fn children_nest_inside_root_and_extend_it() {
        let mut root = leaf("root");
        root.delay_ms = (1, 1);
        let mut a = leaf("child-a");
        a.delay_ms = (5, 5);
        let mut b = leaf("child-b");
        b.delay_ms = (5, 5);
        root.calls = vec![a, b];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(2)).await.unwrap();

        let spans = exporter.spans();
        assert_eq!(spans.len(), 3);
        // Post-order handoff: children first, root last.
        assert_eq!(spans[0].name, "child-a");
        assert_eq!(spans[1].name, "child-b");
        assert_eq!(spans[2].name, "root");

        let root_span = &spans[2];
        assert!(root_span.duration_ns() >= 10_000_000);
        for child in &spans[..2] {
            assert_eq!(child.parent_span_id, Some(root_span.span_id));
            assert!(root_span.start_time_ns <= child.start_time_ns);
            assert!(child.start_time_ns <= child.end_time_ns);
            assert!(child.end_time_ns <= root_span.end_time_ns);
        }
        // Siblings are serial in declaration order.
        assert!(spans[0].end_time_ns <= spans[1].start_time_ns);
    }

    #[tokio::test]
    async fn certain_error_condition_sets_status_and_exception_event() {
        let mut root = leaf("failing-op");
        root.error_conditions = vec![ErrorCondition {
            probability: 100,
            error_type: "X".to_owned(),
            message: "m".to_owned(),
        }];
        root.events = vec![EventSpec {
            name: Template::literal("declared"),
            attributes: Vec::new(),
            offset_ms: None,
        }];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(3)).await.unwrap();

        let span = exporter.last_span().unwrap();
        assert_eq!(
            span.status,
            SpanStatus::Error {
                message: "m".to_owned()
            }
        );
        // Declared events come first, then the exception event.
        assert_eq!(span.events.len(), 2);
        assert_eq!(span.events[0].name, "declared");
        let exception = &span.events[1];
        assert_eq!(exception.name, "exception");
        assert_eq!(
            exception.attributes.get("exception.type"),
            Some(&AttributeValue::from("X"))
        );
        assert_eq!(
            exception.attributes.get("exception.message"),
            Some(&AttributeValue::from("m"))
        );
    }

    #[tokio::test]
    async fn error_does_not_stop_child_emission() {
        let mut root = leaf("root");
        root.error_conditions = vec![ErrorCondition {
            probability: 100,
            error_type: "X".to_owned(),
            message: "m".to_owned(),
        }];
        root.calls = vec![leaf("child")];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(4)).await.unwrap();

        let spans = exporter.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].status, SpanStatus::Ok);
        assert!(spans[1].status.is_error());
    }

    #[tokio::test]
    async fn producer_then_consumer_yields_one_link() {
        let context_store = Arc::new(ContextStore::new(10));
        let exporter = Arc::new(RecordingSpanExporter::new());

        let mut producer = leaf("produce");
        producer.kind = SpanKind::Producer;
        producer.export_context_as =
            Some(Template::compile("k-{{random.uuid}}").unwrap());
        let producer_engine = engine_with(
            scenario_of(producer),
            Arc::clone(&exporter),
            Arc::clone(&context_store),
        );

        let mut consumer = leaf("consume");
        consumer.kind = SpanKind::Consumer;
        consumer.link_from_context = Some("k-*".to_owned());
        let consumer_engine = engine_with(
            scenario_of(consumer),
            Arc::clone(&exporter),
            Arc::clone(&context_store),
        );

        let mut r = rng(5);
        producer_engine.generate_trace(&mut r).await.unwrap();
        consumer_engine.generate_trace(&mut r).await.unwrap();

        let spans = exporter.spans();
        assert_eq!(spans.len(), 2);
        let producer_span = &spans[0];
        let consumer_span = &spans[1];
        assert_eq!(consumer_span.links.len(), 1);
        assert_eq!(consumer_span.links[0].trace_id, producer_span.trace_id);
        assert_eq!(consumer_span.links[0].span_id, producer_span.span_id);
    }

    #[tokio::test]
    async fn child_inherits_parent_attribute() {
        let mut child = leaf("child");
        child.attributes = vec![(
            "inherited".to_owned(),
            AttrTemplate::Text(Template::compile("{{parent.attributes.user.id}}").unwrap()),
        )];
        let mut root = leaf("root");
        root.attributes = vec![(
            "user.id".to_owned(),
            AttrTemplate::Text(Template::literal("42")),
        )];
        root.calls = vec![child];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(6)).await.unwrap();

        let child_span = &exporter.spans()[0];
        assert_eq!(
            child_span.attributes.get("inherited"),
            Some(&AttributeValue::from("42"))
        );
    }

    #[tokio::test]
    async fn context_key_is_visible_to_own_attributes() {
        let mut root = leaf("root");
        root.export_context_as = Some(Template::literal("fixed-key"));
        root.attributes = vec![(
            "ctx".to_owned(),
            AttrTemplate::Text(Template::compile("{{context_key}}").unwrap()),
        )];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(7)).await.unwrap();

        let span = exporter.last_span().unwrap();
        assert_eq!(span.attributes.get("ctx"), Some(&AttributeValue::from("fixed-key")));
    }

    #[tokio::test]
    async fn identifier_discipline_across_the_tree() {
        let mut grandchild = leaf("grandchild");
        grandchild.delay_ms = (1, 1);
        let mut child = leaf("child");
        child.calls = vec![grandchild];
        let mut root = leaf("root");
        root.calls = vec![child, leaf("sibling")];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(8)).await.unwrap();

        let spans = exporter.spans();
        assert_eq!(spans.len(), 4);

        let trace_id = spans[0].trace_id;
        assert!(spans.iter().all(|s| s.trace_id == trace_id));

        let mut span_ids: Vec<_> = spans.iter().map(|s| s.span_id).collect();
        span_ids.sort_by_key(|id| id.0);
        span_ids.dedup();
        assert_eq!(span_ids.len(), 4);

        assert_eq!(spans.iter().filter(|s| s.parent_span_id.is_none()).count(), 1);
        for span in &spans {
            if let Some(parent) = span.parent_span_id {
                assert!(spans.iter().any(|s| s.span_id == parent));
            }
        }
    }

    #[tokio::test]
    async fn event_timestamps_fall_inside_the_span() {
        let mut root = leaf("root");
        root.delay_ms = (10, 10);
        root.events = vec![
            EventSpec {
                name: Template::literal("first"),
                attributes: Vec::new(),
                offset_ms: None,
            },
            EventSpec {
                name: Template::literal("pinned"),
                attributes: Vec::new(),
                offset_ms: Some(2),
            },
        ];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        engine.generate_trace(&mut rng(9)).await.unwrap();

        let span = exporter.last_span().unwrap();
        // Two declared events, evenly spaced: the first sits a third in.
        assert_eq!(
            span.events[0].time_ns,
            span.start_time_ns + 10_000_000 / 3
        );
        assert_eq!(span.events[1].time_ns, span.start_time_ns + 2_000_000);
        for event in &span.events {
            assert!(event.time_ns >= span.start_time_ns);
            assert!(event.time_ns <= span.end_time_ns);
        }
    }

    #[tokio::test]
    async fn template_failure_aborts_the_trace() {
        let mut root = leaf("root");
        root.attributes = vec![(
            "bad".to_owned(),
            AttrTemplate::Text(Template::compile("{{missing_var}}").unwrap()),
        )];

        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        let err = engine.generate_trace(&mut rng(10)).await.unwrap_err();
        assert!(matches!(err, TraceError::Template(_)));
        assert!(exporter.spans().is_empty());
    }

    #[tokio::test]
    async fn exporter_failure_drops_the_rest_of_the_trace() {
        let mut root = leaf("root");
        root.calls = vec![leaf("child")];

        let exporter = Arc::new(
            RecordingSpanExporter::new().with_failure_mode(FailureMode::FirstN(1)),
        );
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        );
        let err = engine.generate_trace(&mut rng(11)).await.unwrap_err();
        assert!(matches!(err, TraceError::Export(_)));
        // The child's export failed; the root was never handed off.
        assert_eq!(exporter.export_count(), 1);
        assert!(exporter.spans().is_empty());
    }

    #[tokio::test]
    async fn completed_traces_reach_the_trace_store() {
        let mut root = leaf("root");
        root.calls = vec![leaf("child")];

        let store = Arc::new(InMemoryTraceStore::new(10));
        let exporter = Arc::new(RecordingSpanExporter::new());
        let engine = engine_with(
            scenario_of(root),
            Arc::clone(&exporter),
            Arc::new(ContextStore::new(10)),
        )
        .with_trace_store(Arc::clone(&store) as Arc<dyn TraceStore>);

        engine.generate_trace(&mut rng(12)).await.unwrap();

        let recent = store.fetch_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].span_count, 2);
        assert_eq!(recent[0].root_operation, "root");
        assert!(!recent[0].has_errors);
    }

    #[tokio::test]
    async fn same_seed_reproduces_the_same_trace_shape() {
        fn scenario() -> Arc<ScenarioSet> {
            let mut child = leaf("child-{{random.int(1, 100)}}");
            child.attributes = vec![(
                "request.id".to_owned(),
                AttrTemplate::Text(Template::compile("{{random.uuid}}").unwrap()),
            )];
            let mut root = leaf("root");
            root.calls = vec![child];
            scenario_of(root)
        }

        async fn run(seed: u64) -> Vec<SpanRecord> {
            let exporter = Arc::new(RecordingSpanExporter::new());
            let engine = engine_with(
                scenario(),
                Arc::clone(&exporter),
                Arc::new(ContextStore::new(10)),
            );
            let mut r = rng(seed);
            engine.generate_trace(&mut r).await.unwrap();
            engine.generate_trace(&mut r).await.unwrap();
            exporter.spans()
        }

        let first = run(1234).await;
        let second = run(1234).await;
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.trace_id, b.trace_id);
            assert_eq!(a.span_id, b.span_id);
            assert_eq!(a.parent_span_id, b.parent_span_id);
            assert_eq!(a.name, b.name);
            assert_eq!(a.attributes, b.attributes);
        }
    }

    #[test]
    fn roulette_fire_rate_tracks_probability() {
        let conditions = vec![ErrorCondition {
            probability: 30,
            error_type: "X".to_owned(),
            message: "m".to_owned(),
        }];
        let mut r = rng(42);

        let n = 10_000u32;
        let mut fired = 0u32;
        for _ in 0..n {
            if roll_error(&conditions, &mut r).is_some() {
                fired += 1;
            }
        }

        // p +/- 3 * sqrt(p * (100 - p) / n), in percent.
        let rate = f64::from(fired) * 100.0 / f64::from(n);
        let tolerance = 3.0 * (30.0 * 70.0 / f64::from(n)).sqrt();
        assert!(
            (rate - 30.0).abs() <= tolerance,
            "fire rate {rate} outside {tolerance} of 30"
        );
    }

    #[test]
    fn roulette_fires_at_most_one_condition() {
        let conditions = vec![
            ErrorCondition {
                probability: 60,
                error_type: "A".to_owned(),
                message: "a".to_owned(),
            },
            ErrorCondition {
                probability: 40,
                error_type: "B".to_owned(),
                message: "b".to_owned(),
            },
        ];
        let mut r = rng(7);

        let mut a = 0u32;
        let mut b = 0u32;
        for _ in 0..5_000 {
            match roll_error(&conditions, &mut r) {
                Some(c) if c.error_type == "A" => a += 1,
                Some(_) => b += 1,
                // Probabilities sum to 100: exactly one always fires.
                None => panic!("no condition fired"),
            }
        }
        let a_rate = f64::from(a) * 100.0 / 5_000.0;
        let b_rate = f64::from(b) * 100.0 / 5_000.0;
        assert!((a_rate - 60.0).abs() < 3.0, "A rate {a_rate}");
        assert!((b_rate - 40.0).abs() < 3.0, "B rate {b_rate}");
    }

    #[test]
    fn zero_probability_never_fires() {
        let conditions = vec![ErrorCondition {
            probability: 0,
            error_type: "X".to_owned(),
            message: "m".to_owned(),
        }];
        let mut r = rng(1);
        for _ in 0..1_000 {
            assert!(roll_error(&conditions, &mut r).is_none());
        }
    }
}
