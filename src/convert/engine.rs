//! Dispatch tables and the shared traversal loop

use std::collections::HashMap;
use std::ops::RangeInclusive;

use super::{ConvertError, ConvertResult};

/// What to do with a key that has no registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Abort the whole conversion with [`ConvertError::UnmappedKey`]
    Strict,
    /// Skip the key
    Permissive,
}

/// A field handler: source value, converter context, output accumulator
pub type Handler<V, C, O> = fn(&V, &mut C, &mut O) -> ConvertResult<()>;

/// Handlers of one converter, keyed by source attribute name
///
/// Numeric keys (e.g. MAB field numbers) may additionally be routed through
/// ranges. An exact key always wins over a range.
pub struct HandlerTable<V, C, O> {
    converter: &'static str,
    policy: FallbackPolicy,
    exact: HashMap<&'static str, Handler<V, C, O>>,
    ranges: Vec<(RangeInclusive<u32>, Handler<V, C, O>)>,
}

impl<V, C, O> HandlerTable<V, C, O> {
    pub fn new(converter: &'static str, policy: FallbackPolicy) -> Self {
        Self {
            converter,
            policy,
            exact: HashMap::new(),
            ranges: Vec::new(),
        }
    }

    /// Register a handler for one key
    pub fn on(mut self, key: &'static str, handler: Handler<V, C, O>) -> Self {
        self.exact.insert(key, handler);
        self
    }

    /// Register one handler for several keys
    pub fn on_each(mut self, keys: &[&'static str], handler: Handler<V, C, O>) -> Self {
        for key in keys {
            self.exact.insert(key, handler);
        }
        self
    }

    /// Register a handler for every numeric key inside `range`
    pub fn on_range(mut self, range: RangeInclusive<u32>, handler: Handler<V, C, O>) -> Self {
        self.ranges.push((range, handler));
        self
    }

    pub fn converter(&self) -> &'static str {
        self.converter
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Find the handler for `key`: exact match first, then the first matching range
    pub fn resolve(&self, key: &str) -> Option<Handler<V, C, O>> {
        if let Some(handler) = self.exact.get(key) {
            return Some(*handler);
        }

        let code: u32 = key.trim().parse().ok()?;
        self.ranges
            .iter()
            .find(|(range, _)| range.contains(&code))
            .map(|(_, handler)| *handler)
    }

    /// Dispatch a single key, applying the fallback policy when unmapped
    pub fn dispatch(&self, key: &str, value: &V, ctx: &mut C, out: &mut O) -> ConvertResult<()> {
        match self.resolve(key) {
            Some(handler) => handler(value, ctx, out),
            None => match self.policy {
                FallbackPolicy::Strict => Err(ConvertError::UnmappedKey {
                    converter: self.converter,
                    key: key.to_string(),
                    record: None,
                }),
                FallbackPolicy::Permissive => {
                    tracing::trace!(converter = self.converter, key, "Skipping unmapped key");
                    Ok(())
                }
            },
        }
    }

    /// Dispatch every entry in order
    pub fn visit<'a, I>(&self, entries: I, ctx: &mut C, out: &mut O) -> ConvertResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a V)>,
        V: 'a,
    {
        for (key, value) in entries {
            self.dispatch(key, value, ctx, out)?;
        }
        Ok(())
    }
}

/// A source-format converter
///
/// Implementors are unit types; all per-conversion state lives in
/// `Context`, which is created once per call and threaded through every
/// handler.
pub trait Convert {
    type Source: ?Sized;
    type Value: 'static;
    type Context: Default + 'static;
    type Output: 'static;

    fn table() -> &'static HandlerTable<Self::Value, Self::Context, Self::Output>;

    /// Top-level entries of `source` in native iteration order
    fn entries(source: &Self::Source) -> ConvertResult<Vec<(&str, &Self::Value)>>;

    /// Identifier used to label errors, when the source carries one
    fn record_id(_source: &Self::Source) -> Option<String> {
        None
    }

    /// Runs before the traversal (e.g. deriving a default language)
    fn prepare(
        _source: &Self::Source,
        _ctx: &mut Self::Context,
        _out: &mut Self::Output,
    ) -> ConvertResult<()> {
        Ok(())
    }

    /// Runs after every entry has been visited
    fn finish(_ctx: &mut Self::Context, _out: &mut Self::Output) -> ConvertResult<()> {
        Ok(())
    }

    /// Convert with an explicit initial context; returns the final context
    fn convert_with(
        source: &Self::Source,
        mut ctx: Self::Context,
        out: &mut Self::Output,
    ) -> ConvertResult<Self::Context> {
        let label = |err: ConvertError| match Self::record_id(source) {
            Some(id) => err.for_record(id),
            None => err,
        };

        Self::prepare(source, &mut ctx, out).map_err(label)?;
        let entries = Self::entries(source).map_err(label)?;
        Self::table()
            .visit(entries, &mut ctx, out)
            .map_err(label)?;
        Self::finish(&mut ctx, out).map_err(label)?;

        Ok(ctx)
    }

    fn convert(source: &Self::Source, out: &mut Self::Output) -> ConvertResult<Self::Context> {
        Self::convert_with(source, Self::Context::default(), out)
    }
}
