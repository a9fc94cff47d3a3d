//! The derived-variable resolver: planner and executor for `get_derived`
//! and friends (§4.2).
//!
//! The planner and executor are unified into one recursive function,
//! [`Resolver::resolve_goal`], since the execution steps ("resolve each
//! source, allocate the output, invoke `compute`") are themselves just the
//! planner descending one level. Cycle-freedom (`P6`) is enforced by an
//! explicit visitor stack of `(conversion_name, rank)` pairs rather than a
//! fixed-width bitset, since conversion names are open-ended strings.

use std::rc::Rc;

use ahash::AHashSet;
use log::{debug, trace, warn};

use crate::error::{CoreError, ErrorKind};
use crate::external::UnitConverter;
use crate::model::{DimensionKind, Product, Variable};
use crate::registry::{ConversionDescriptor, ConversionRegistry, DimSpec};

/// A visitor key: the conversion name currently in progress plus its rank
/// (`num_dimensions`), matching §9's redesign note.
type VisitorKey = (Rc<str>, u8);

/// Planner + executor over a frozen [`ConversionRegistry`] and a unit
/// conversion collaborator. Stateless between calls; all per-resolution
/// state (the visitor stack, recursion depth) lives on the call stack.
pub struct Resolver<'a> {
    registry: &'a ConversionRegistry,
    units: &'a dyn UnitConverter,
    max_rank: usize,
    max_recursion_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a ConversionRegistry, units: &'a dyn UnitConverter, max_rank: usize, max_recursion_depth: usize) -> Self {
        Self { registry, units, max_rank, max_recursion_depth }
    }

    /// `get_derived(product, name, unit?, dims)`. Element type is
    /// preserved: the cheap path keeps the product's existing type, the
    /// derived path keeps the chosen descriptor's declared type. Use
    /// [`Resolver::get_derived_as`] to additionally coerce the result.
    pub fn get_derived(&self, product: &Product, name: &str, unit: Option<&str>, dims: &[DimSpec]) -> Result<Variable, CoreError> {
        let mut stack = AHashSet::default();
        self.resolve_goal(product, name, unit, dims, &mut stack, 0)
    }

    /// `get_derived`, then coerces the result to `element_type`.
    pub fn get_derived_as(
        &self,
        product: &Product,
        name: &str,
        unit: Option<&str>,
        dims: &[DimSpec],
        element_type: crate::model::ElementType,
    ) -> Result<Variable, CoreError> {
        let mut var = self.get_derived(product, name, unit, dims)?;
        var.convert_type(element_type)?;
        Ok(var)
    }

    /// `add_derived(product, name, unit?, dims)`: ensures `product`
    /// contains a variable of the requested signature, deriving it if
    /// absent and removing any stale same-named variable of a different
    /// shape first.
    pub fn add_derived(&self, product: &mut Product, name: &str, unit: Option<&str>, dims: &[DimSpec]) -> Result<(), CoreError> {
        if let Some(existing) = product.get(name) {
            if matches_goal(existing, dims) {
                if let Some(u) = unit {
                    if !self.units.variable_has_unit(existing, u) {
                        let mut coerced = existing.clone();
                        self.units.convert_variable(&mut coerced, u).map_err(|e| e.annotate(format!("could not add derived variable '{name}'")))?;
                        product.replace(coerced)?;
                    }
                }
                return Ok(());
            }
        }
        let derived = self.get_derived(product, name, unit, dims)?;
        product.remove(name);
        product.add(derived)
    }

    /// `list_conversions(product?)`: with no product, dumps the entire
    /// registry; with a product, mirrors the planner to print a tree of
    /// what is currently applicable, suppressing cycles with the same
    /// visitor-stack discipline.
    pub fn list_conversions(&self, product: Option<&Product>) -> String {
        let mut names: Vec<&str> = self.registry.names().collect();
        names.sort_unstable();
        names.dedup();

        let mut out = String::new();
        for name in names {
            let Some(candidates) = self.registry.lookup(name) else { continue };
            for (idx, candidate) in candidates.iter().enumerate() {
                let mut stack = AHashSet::default();
                self.print_descriptor(&mut out, 0, name, idx, candidate, product, &mut stack);
            }
        }
        out
    }

    fn print_descriptor(
        &self,
        out: &mut String,
        indent: usize,
        name: &str,
        idx: usize,
        candidate: &ConversionDescriptor,
        product: Option<&Product>,
        stack: &mut AHashSet<VisitorKey>,
    ) {
        let pad = "  ".repeat(indent);
        let kinds: Vec<DimensionKind> = candidate.output.kinds();
        out.push_str(&format!("{pad}{name}#{idx} -> {kinds:?} [{}]\n", candidate.note.as_deref().unwrap_or("")));

        let rank = candidate.output.dims.len() as u8;
        let key: VisitorKey = (Rc::from(name), rank);
        if stack.contains(&key) {
            out.push_str(&format!("{pad}  <cycle, skipped>\n"));
            return;
        }
        stack.insert(key.clone());

        for source in &candidate.sources {
            out.push_str(&format!("{pad}  requires {} {:?}\n", source.name, source.kinds()));
            let already_present = product.and_then(|p| p.get(&source.name)).is_some();
            if already_present {
                continue;
            }
            match self.registry.lookup(&source.name) {
                Some(sub_candidates) => {
                    for (sidx, sub) in sub_candidates.iter().enumerate() {
                        self.print_descriptor(out, indent + 2, &source.name, sidx, sub, product, stack);
                    }
                }
                None => {
                    out.push_str(&format!("{pad}    <no conversion registered, error if not in product>\n"));
                }
            }
        }
        stack.remove(&key);
    }

    fn resolve_goal(
        &self,
        product: &Product,
        name: &str,
        unit: Option<&str>,
        dims: &[DimSpec],
        stack: &mut AHashSet<VisitorKey>,
        depth: usize,
    ) -> Result<Variable, CoreError> {
        if depth > self.max_recursion_depth {
            return Err(CoreError::with_message(
                ErrorKind::VariableNotFound,
                format!("max recursion depth exceeded while deriving '{name}'"),
            ));
        }

        // Step 1: cheap path — already present with matching dims.
        if let Some(existing) = product.get(name) {
            if matches_goal(existing, dims) {
                trace!("goal '{name}' resolved via cheap path");
                let mut copy = existing.clone();
                if let Some(u) = unit {
                    if !self.units.variable_has_unit(&copy, u) {
                        self.units
                            .convert_variable(&mut copy, u)
                            .map_err(|e| e.annotate(format!("could not convert unit of '{name}'")))?;
                    }
                }
                debug!("resolved '{name}' via cheap path");
                return Ok(copy);
            }
        }

        // Step 2: registry search, in insertion order.
        let rank = dims.len() as u8;
        let goal_kinds: Vec<DimensionKind> = dims.iter().map(|d| d.kind).collect();
        let candidates = self.registry.lookup(name).unwrap_or(&[]);
        for (idx, candidate) in candidates.iter().enumerate() {
            if !candidate.is_enabled() {
                trace!("candidate {idx} for '{name}' disabled, skipping");
                continue;
            }
            let key: VisitorKey = (Rc::from(name), rank);
            if stack.contains(&key) {
                trace!("candidate {idx} for '{name}' at rank {rank} already on the recursion stack, cycle, skipping");
                continue;
            }
            if candidate.output.kinds() != goal_kinds {
                trace!("candidate {idx} for '{name}' has a different dimension signature, skipping");
                continue;
            }
            if !independent_lengths_match(&candidate.output.dims, dims) {
                trace!("candidate {idx} for '{name}' has a mismatched independent-axis length, skipping");
                continue;
            }

            stack.insert(key.clone());
            let sources_result = self.resolve_sources(product, candidate, stack, depth);
            stack.remove(&key);

            // Step 2d: a source requirement that could not be satisfied
            // just rules this candidate out — try the next one. Once every
            // source is in hand the plan is committed: invoking `compute`
            // and allocating its output are no longer "try the next
            // candidate" territory, so their errors propagate instead of
            // being swallowed here (§4.2 Execution: "On failure ...
            // propagate the error").
            let sources = match sources_result {
                Ok(sources) => sources,
                Err(e) => {
                    trace!("candidate {idx} for '{name}' could not satisfy its sources: {e}; trying next");
                    continue;
                }
            };

            let mut derived = self.invoke_candidate(product, candidate, sources)?;
            if let Some(u) = unit {
                if !self.units.variable_has_unit(&derived, u) {
                    self.units
                        .convert_variable(&mut derived, u)
                        .map_err(|e| e.annotate(format!("could not convert unit of '{name}'")))?;
                }
            }
            debug!("resolved '{name}' via candidate #{idx}");
            return Ok(derived);
        }

        warn!("no plan found for '{name}'");
        Err(CoreError::with_message(ErrorKind::VariableNotFound, format!("no conversion plan found for '{name}'")))
    }

    /// Resolves every source requirement for `candidate`, recursively.
    /// Failure here means the candidate itself is not viable (step 2d);
    /// the caller treats it as "try the next candidate," never as a
    /// propagated error.
    fn resolve_sources(
        &self,
        product: &Product,
        candidate: &ConversionDescriptor,
        stack: &mut AHashSet<VisitorKey>,
        depth: usize,
    ) -> Result<Vec<Variable>, CoreError> {
        let mut sources = Vec::with_capacity(candidate.sources.len());
        for requirement in &candidate.sources {
            let mut source = self.resolve_goal(product, &requirement.name, requirement.unit.as_deref(), &requirement.dims, stack, depth + 1)?;
            if source.element_type() != requirement.element_type {
                source.convert_type(requirement.element_type)?;
            }
            sources.push(source);
        }
        Ok(sources)
    }

    /// Allocates the output and invokes `compute` now that every source is
    /// resolved — the plan is committed at this point, so any error here
    /// (output allocation or the `compute` call itself) propagates to the
    /// caller rather than being treated as a planning miss.
    fn invoke_candidate(&self, product: &Product, candidate: &ConversionDescriptor, sources: Vec<Variable>) -> Result<Variable, CoreError> {
        let output_dims = resolve_output_dims(product, &candidate.output.dims)?;
        let mut output = Variable::new(
            candidate.output.name.clone(),
            candidate.output.element_type,
            output_dims,
            candidate.output.unit.clone(),
            self.max_rank,
        )?;

        (candidate.compute)(&mut output, &sources).map_err(|e| e.annotate(format!("could not derive variable '{}'", candidate.output.name)))?;
        Ok(output)
    }
}

fn matches_goal(var: &Variable, dims: &[DimSpec]) -> bool {
    if var.dimensions().len() != dims.len() {
        return false;
    }
    var.dimensions().iter().zip(dims).all(|(&(kind, length), spec)| {
        if kind != spec.kind {
            return false;
        }
        match spec.independent_length {
            Some(want) => length == want,
            None => true,
        }
    })
}

fn independent_lengths_match(candidate_dims: &[DimSpec], goal_dims: &[DimSpec]) -> bool {
    candidate_dims.iter().zip(goal_dims).all(|(cand, goal)| match goal.independent_length {
        Some(want) => cand.independent_length == Some(want),
        None => true,
    })
}

fn resolve_output_dims(product: &Product, specs: &[DimSpec]) -> Result<Vec<(DimensionKind, usize)>, CoreError> {
    specs
        .iter()
        .map(|spec| {
            let length = match spec.kind {
                DimensionKind::Independent => spec.independent_length.ok_or_else(|| {
                    CoreError::with_message(ErrorKind::InvalidArgument, "an independent output axis requires an explicit length")
                })?,
                kind => product
                    .dimension_length(kind)
                    .ok_or_else(|| CoreError::with_message(ErrorKind::ProductError, format!("product has no established length for '{kind}'")))?,
            };
            Ok((spec.kind, length))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::external::TableUnitConverter;
    use crate::model::{ElementBuffer, ElementType};
    use crate::registry::{ConversionRegistryBuilder, VarSignature};

    fn pressure_product(unit: &str, values: Vec<f64>) -> Product {
        let mut p = Product::new();
        let len = values.len();
        p.add(
            Variable::from_buffer(
                "pressure",
                vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, len)],
                Some(unit.to_string()),
                ElementBuffer::Float64(values),
                8,
            )
            .unwrap(),
        )
        .unwrap();
        p
    }

    #[test]
    fn scenario_4_resolver_cheap_path_converts_units() {
        let registry = ConversionRegistryBuilder::new(8).freeze();
        let units = TableUnitConverter::with_defaults();
        let resolver = Resolver::new(&registry, &units, 8, 64);
        let product = pressure_product("hPa", vec![1.0, 2.0, 3.0]);

        let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)];
        let result = resolver.get_derived(&product, "pressure", Some("Pa"), &dims).unwrap();

        assert_eq!(result.data().as_f64_slice().unwrap(), &[100.0, 200.0, 300.0]);
        assert_eq!(result.unit(), Some("Pa"));
    }

    #[test]
    fn scenario_5_resolver_cycle_refusal() {
        let mut builder = ConversionRegistryBuilder::new(8);
        let dims = vec![DimSpec::shared(DimensionKind::Time)];
        builder
            .register(ConversionDescriptor {
                output: VarSignature::new("a", ElementType::Float64, None, dims.clone()),
                sources: vec![VarSignature::new("b", ElementType::Float64, None, dims.clone())],
                enabled: None,
                note: None,
                compute: Arc::new(|_out, _sources| Ok(())),
            })
            .unwrap();
        builder
            .register(ConversionDescriptor {
                output: VarSignature::new("b", ElementType::Float64, None, dims.clone()),
                sources: vec![VarSignature::new("a", ElementType::Float64, None, dims.clone())],
                enabled: None,
                note: None,
                compute: Arc::new(|_out, _sources| Ok(())),
            })
            .unwrap();
        let registry = builder.freeze();
        let units = TableUnitConverter::with_defaults();
        let resolver = Resolver::new(&registry, &units, 8, 64);
        let product = Product::new();

        let err = resolver.get_derived(&product, "a", None, &dims).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VariableNotFound);
    }

    #[test]
    fn p3_get_derived_is_idempotent() {
        let registry = ConversionRegistryBuilder::new(8).freeze();
        let units = TableUnitConverter::with_defaults();
        let resolver = Resolver::new(&registry, &units, 8, 64);
        let product = pressure_product("hPa", vec![1.0, 2.0, 3.0]);
        let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)];

        let first = resolver.get_derived(&product, "pressure", Some("Pa"), &dims).unwrap();
        let second = resolver.get_derived(&product, "pressure", Some("Pa"), &dims).unwrap();
        assert_eq!(first.data(), second.data());
        assert_eq!(first.unit(), second.unit());
    }

    #[test]
    fn p4_cheap_path_returns_deep_copy() {
        let registry = ConversionRegistryBuilder::new(8).freeze();
        let units = TableUnitConverter::with_defaults();
        let resolver = Resolver::new(&registry, &units, 8, 64);
        let product = pressure_product("hPa", vec![1.0, 2.0, 3.0]);
        let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)];

        let mut copy = resolver.get_derived(&product, "pressure", None, &dims).unwrap();
        copy.data_mut().as_f64_slice_mut().unwrap()[0] = 999.0;
        assert_eq!(product.get("pressure").unwrap().data().as_f64_slice().unwrap()[0], 1.0);
    }

    #[test]
    fn compute_failure_on_a_committed_candidate_propagates_instead_of_becoming_variable_not_found() {
        use crate::conversions::register_builtins;
        use crate::external::SimpleProfileOps;

        let mut builder = ConversionRegistryBuilder::new(8);
        register_builtins(&mut builder, Arc::new(SimpleProfileOps)).unwrap();
        let registry = builder.freeze();
        let units = TableUnitConverter::with_defaults();
        let resolver = Resolver::new(&registry, &units, 8, 64);

        let mut product = Product::new();
        product
            .add(
                Variable::from_buffer(
                    "altitude",
                    vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 1)],
                    Some("m".to_string()),
                    ElementBuffer::Float64(vec![1000.0]),
                    8,
                )
                .unwrap(),
            )
            .unwrap();

        let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)];
        let err = resolver.get_derived(&product, "altitude_bounds", None, &dims).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn add_derived_is_a_noop_when_already_present_with_matching_dims() {
        let registry = ConversionRegistryBuilder::new(8).freeze();
        let units = TableUnitConverter::with_defaults();
        let resolver = Resolver::new(&registry, &units, 8, 64);
        let mut product = pressure_product("Pa", vec![1.0, 2.0, 3.0]);
        let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)];

        resolver.add_derived(&mut product, "pressure", None, &dims).unwrap();
        assert_eq!(product.variables().len(), 1);
    }
}
