use crate::{
    canon::canonicalize,
    keywords, location,
    node::{Node, Property},
    ptr,
    registry::Registry,
    Error, Output, OutputUnit,
};
use fxhash::FxHashSet as HashSet;
use serde_json as sj;

// Tolerance applied by the "multipleOf" keyword when deciding whether an
// inexact division remainder still counts as zero (or as the divisor).
const MULTIPLE_OF_EPSILON: f64 = f32::EPSILON as f64;

/// Validator owns a Registry of schemas and evaluates instances against
/// them. Each Validator is independent: schemas registered here are visible
/// only to this Validator's `$ref` resolution.
pub struct Validator {
    registry: Registry,
}

impl Validator {
    pub fn new() -> Validator {
        Validator {
            registry: Registry::new(),
        }
    }

    /// Register `schema` under `uri`, making it available to `$ref` and to
    /// [`Validator::validate_registered`]. The entry persists until
    /// overwritten or unregistered.
    pub fn register_schema(&mut self, schema: &sj::Value, uri: &str) -> Result<(), Error> {
        let uri = normalize_uri(uri)?;
        self.registry.register(schema, &uri)
    }

    /// Validate `instance` against `schema`. The schema is registered under
    /// its `$id` (or under the anonymous URI `""`) for the duration of the
    /// call, and unregistered afterward.
    pub fn validate(&mut self, schema: &sj::Value, instance: &sj::Value) -> Result<Output, Error> {
        let uri = match schema.get(keywords::ID) {
            Some(sj::Value::String(id)) => normalize_uri(id)?,
            _ => String::new(),
        };
        self.registry.register(schema, &uri)?;
        let result = self.validate_registered(&uri, instance);
        self.registry.unregister(&uri);
        result
    }

    /// Validate `instance` against the schema previously registered under
    /// `uri`. Skips the per-call register / unregister cycle of
    /// [`Validator::validate`].
    pub fn validate_registered(&self, uri: &str, instance: &sj::Value) -> Result<Output, Error> {
        let schema = self
            .registry
            .lookup(uri)
            .ok_or_else(|| Error::InvalidReference {
                location: location::root(uri),
                reference: uri.to_string(),
            })?;
        let instance = Node::build(instance, "")?;
        tracing::debug!(uri, instance = instance.location(), "validating");

        let mut errors = Vec::new();
        let mut eval = Evaluation {
            registry: &self.registry,
            active_refs: Vec::new(),
        };
        let valid = eval.apply(schema, &instance, &mut errors)?;

        Ok(Output {
            valid,
            errors: if valid { Vec::new() } else { errors },
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate `instance` against `schema` using a fresh Validator.
pub fn validate(schema: &sj::Value, instance: &sj::Value) -> Result<Output, Error> {
    Validator::new().validate(schema, instance)
}

// A registered base URI must be absolute (or the anonymous ""), without a
// fragment, and is normalized so that `$id` and `$ref` spellings of the same
// IRI agree on a registry key.
fn normalize_uri(uri: &str) -> Result<String, Error> {
    if uri.is_empty() {
        return Ok(String::new());
    }
    let parsed = url::Url::parse(uri).map_err(|_| Error::InvalidSchema {
        location: uri.to_string(),
        expected: "an absolute base URI",
    })?;
    if parsed.fragment().is_some() || parsed.cannot_be_a_base() {
        return Err(Error::InvalidSchema {
            location: uri.to_string(),
            expected: "an absolute base URI without a fragment",
        });
    }
    Ok(parsed.to_string())
}

// Evaluation is the transient state of one validation: the registry to
// resolve references against, and the stack of $ref expansions currently
// being applied.
struct Evaluation<'v> {
    registry: &'v Registry,
    // Active (schema location, instance location) reference expansions.
    // A reference which re-enters an active pair is vacuously valid, which
    // keeps a cyclic schema from recursing without consuming instance.
    active_refs: Vec<(String, String)>,
}

impl<'v> Evaluation<'v> {
    /// apply evaluates `schema` against `instance`, appending failure
    /// OutputUnits to `errors`, and returns whether the instance conforms.
    fn apply(
        &mut self,
        schema: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        match schema {
            Node::Bool { value: true, .. } => Ok(true),
            Node::Bool { location, .. } => {
                errors.push(OutputUnit::new(location, instance.location()));
                Ok(false)
            }
            Node::Object { properties, .. } => {
                let mut valid = true;

                for prop in properties {
                    let mut buffered = Vec::new();
                    let ok = self.apply_keyword(
                        &prop.name,
                        &prop.value,
                        instance,
                        schema,
                        &mut buffered,
                    )?;

                    // A failed keyword contributes one OutputUnit for the
                    // keyword itself, then the errors its handler buffered
                    // while recursing.
                    if !ok {
                        valid = false;
                        errors.push(OutputUnit::new(prop.value.location(), instance.location()));
                        errors.append(&mut buffered);
                    }
                }
                Ok(valid)
            }
            other => Err(Error::InvalidSchema {
                location: other.location().to_string(),
                expected: "a schema (boolean or object)",
            }),
        }
    }

    fn apply_keyword(
        &mut self,
        keyword: &str,
        value: &Node,
        instance: &Node,
        parent: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        use crate::keywords as kw;

        match keyword {
            kw::SCHEMA => self.dialect(value),
            kw::ID => self.id(value),
            kw::ANCHOR
            | kw::DYNAMIC_ANCHOR
            | kw::DYNAMIC_REF
            | kw::UNEVALUATED_PROPERTIES
            | kw::UNEVALUATED_ITEMS => Err(Error::UnsupportedFeature {
                keyword: keyword.to_string(),
                location: value.location().to_string(),
            }),
            kw::REF => self.reference(value, instance, errors),

            kw::ALL_OF => self.all_of(value, instance, errors),
            kw::ANY_OF => self.any_of(value, instance, errors),
            kw::ONE_OF => self.one_of(value, instance, errors),
            kw::NOT => self.not(value, instance),
            kw::THEN => self.then_else(value, instance, parent, errors, true),
            kw::ELSE => self.then_else(value, instance, parent, errors, false),

            kw::PROPERTIES => self.properties(value, instance, errors),
            kw::PATTERN_PROPERTIES => self.pattern_properties(value, instance, errors),
            kw::ADDITIONAL_PROPERTIES => {
                self.additional_properties(value, instance, parent, errors)
            }
            kw::PROPERTY_NAMES => self.property_names(value, instance, errors),
            kw::DEPENDENT_SCHEMAS => self.dependent_schemas(value, instance, errors),
            kw::DEPENDENT_REQUIRED => self.dependent_required(value, instance),
            kw::REQUIRED => self.required(value, instance),
            kw::MAX_PROPERTIES => self.count_properties(value, instance, |count, bound| {
                count <= bound
            }),
            kw::MIN_PROPERTIES => self.count_properties(value, instance, |count, bound| {
                count >= bound
            }),

            kw::PREFIX_ITEMS => self.prefix_items(value, instance, errors),
            kw::ITEMS => self.items(value, instance, parent, errors),
            kw::CONTAINS => self.contains(value, instance, parent, errors),
            kw::MAX_ITEMS => self.count_items(value, instance, |count, bound| count <= bound),
            kw::MIN_ITEMS => self.count_items(value, instance, |count, bound| count >= bound),
            kw::UNIQUE_ITEMS => self.unique_items(value, instance),

            kw::TYPE => self.type_(value, instance),
            kw::CONST => Ok(canonicalize(instance) == canonicalize(value)),
            kw::ENUM => self.enum_(value, instance),
            kw::MAXIMUM => self.compare(value, instance, |n, bound| n <= bound),
            kw::MINIMUM => self.compare(value, instance, |n, bound| n >= bound),
            kw::EXCLUSIVE_MAXIMUM => self.compare(value, instance, |n, bound| n < bound),
            kw::EXCLUSIVE_MINIMUM => self.compare(value, instance, |n, bound| n > bound),
            kw::MULTIPLE_OF => self.multiple_of(value, instance),
            kw::MAX_LENGTH => self.length(value, instance, |len, bound| len <= bound),
            kw::MIN_LENGTH => self.length(value, instance, |len, bound| len >= bound),
            kw::PATTERN => self.pattern(value, instance),

            // Unrecognized keywords don't constrain validation. Neither does
            // "if" directly: its "then" / "else" siblings read it back from
            // the parent schema. "minContains" / "maxContains" are read by
            // the sibling "contains".
            _ => Ok(true),
        }
    }

    // The sole accepted "$schema" value is the draft 2020-12 meta-schema URI.
    fn dialect(&self, value: &Node) -> Result<bool, Error> {
        let dialect = value.expect_str()?;
        if dialect != keywords::DIALECT_2020_12 {
            return Err(Error::UnsupportedDialect {
                dialect: dialect.to_string(),
            });
        }
        Ok(true)
    }

    // "$id" is legal only at the document root, where the schema was already
    // registered under it. Embedded resources are not supported.
    fn id(&self, value: &Node) -> Result<bool, Error> {
        if value.location().ends_with("#/$id") {
            Ok(true)
        } else {
            Err(Error::UnsupportedFeature {
                keyword: keywords::ID.to_string(),
                location: value.location().to_string(),
            })
        }
    }

    fn reference(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let reference = value.expect_str()?;
        let (schema_base, _) = location::split(value.location());

        let unresolved = || Error::InvalidReference {
            location: value.location().to_string(),
            reference: reference.to_string(),
        };

        let (base, fragment) = if schema_base.is_empty() {
            // Within an anonymous schema, a fragment-only reference resolves
            // inside the anonymous document, and any other reference must
            // itself be an absolute IRI.
            if let Some(fragment) = reference.strip_prefix('#') {
                (String::new(), fragment.to_string())
            } else {
                let url = url::Url::parse(reference).map_err(|_| unresolved())?;
                split_fragment(url)
            }
        } else {
            let base = url::Url::parse(schema_base).map_err(|_| unresolved())?;
            let url = base.join(reference).map_err(|_| unresolved())?;
            split_fragment(url)
        };

        let root = self.registry.lookup(&base).ok_or_else(unresolved)?;
        let target = ptr::walk_fragment(root, &fragment, value.location(), reference)?;

        // A reference re-entering an active (schema, instance) expansion
        // cannot be refuted by a finite instance, and is vacuously valid.
        let entry = (
            target.location().to_string(),
            instance.location().to_string(),
        );
        if self.active_refs.contains(&entry) {
            return Ok(true);
        }

        self.active_refs.push(entry);
        let result = self.apply(target, instance, errors);
        self.active_refs.pop();
        result
    }

    fn all_of(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let mut valid = true;
        for member in value.expect_array()? {
            valid = self.apply(member, instance, errors)? && valid;
        }
        Ok(valid)
    }

    // Every member is applied, and every attempt's errors accumulate into
    // the handler buffer, whether or not some member passes.
    fn any_of(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let mut valid = false;
        for member in value.expect_array()? {
            valid = self.apply(member, instance, errors)? || valid;
        }
        Ok(valid)
    }

    fn one_of(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let mut matched = 0;
        for member in value.expect_array()? {
            if self.apply(member, instance, errors)? {
                matched += 1;
            }
        }
        Ok(matched == 1)
    }

    // "not" recurses only to decide, so its sub-errors are discarded and a
    // failure surfaces as the lone keyword-level OutputUnit.
    fn not(&mut self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let mut discard = Vec::new();
        Ok(!self.apply(value, instance, &mut discard)?)
    }

    // "then" applies when the sibling "if" passes, "else" when it fails.
    // The "if" probe itself never contributes errors.
    fn then_else(
        &mut self,
        value: &Node,
        instance: &Node,
        parent: &Node,
        errors: &mut Vec<OutputUnit>,
        when: bool,
    ) -> Result<bool, Error> {
        let Some(condition) = parent.get(keywords::IF) else {
            return Ok(true);
        };
        let mut discard = Vec::new();
        if self.apply(condition, instance, &mut discard)? == when {
            self.apply(value, instance, errors)
        } else {
            Ok(true)
        }
    }

    fn properties(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let subschemas = value.expect_object()?;
        let Some(members) = instance.as_object() else {
            return Ok(true);
        };

        let mut valid = true;
        for member in members {
            if let Some(sub) = subschemas.iter().find(|p| p.name == member.name) {
                valid = self.apply(&sub.value, &member.value, errors)? && valid;
            }
        }
        Ok(valid)
    }

    fn pattern_properties(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let pairs = value.expect_object()?;
        let Some(members) = instance.as_object() else {
            return Ok(true);
        };

        let mut valid = true;
        for pair in pairs {
            let re = compile_pattern(&pair.name, pair.value.location())?;
            for member in members {
                if re.is_match(&member.name) {
                    valid = self.apply(&pair.value, &member.value, errors)? && valid;
                }
            }
        }
        Ok(valid)
    }

    // "additionalProperties" applies to members not named by the sibling
    // "properties" and not matched by any sibling "patternProperties"
    // pattern. With neither sibling present, it applies to every member.
    fn additional_properties(
        &mut self,
        value: &Node,
        instance: &Node,
        parent: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let Some(members) = instance.as_object() else {
            return Ok(true);
        };

        let named: &[Property] = match parent.get(keywords::PROPERTIES) {
            Some(properties) => properties.expect_object()?,
            None => &[],
        };
        let mut patterns = Vec::new();
        if let Some(pairs) = parent.get(keywords::PATTERN_PROPERTIES) {
            for pair in pairs.expect_object()? {
                patterns.push(compile_pattern(&pair.name, pair.value.location())?);
            }
        }

        let mut valid = true;
        for member in members {
            let covered = named.iter().any(|p| p.name == member.name)
                || patterns.iter().any(|re| re.is_match(&member.name));
            if !covered {
                valid = self.apply(value, &member.value, errors)? && valid;
            }
        }
        Ok(valid)
    }

    // Each member name is validated as a synthesized string node located at
    // the member's value slot.
    fn property_names(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let Some(members) = instance.as_object() else {
            return Ok(true);
        };

        let mut valid = true;
        for member in members {
            let key = Node::String {
                location: member.value.location().to_string(),
                value: member.name.clone(),
            };
            valid = self.apply(value, &key, errors)? && valid;
        }
        Ok(valid)
    }

    fn dependent_schemas(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let pairs = value.expect_object()?;
        if instance.as_object().is_none() {
            return Ok(true);
        }

        let mut valid = true;
        for pair in pairs {
            if instance.get(&pair.name).is_some() {
                valid = self.apply(&pair.value, instance, errors)? && valid;
            }
        }
        Ok(valid)
    }

    fn dependent_required(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let conditions = value.expect_object()?;
        if instance.as_object().is_none() {
            return Ok(true);
        }

        for condition in conditions {
            if instance.get(&condition.name).is_none() {
                continue;
            }
            for needed in condition.value.expect_array()? {
                if instance.get(needed.expect_str()?).is_none() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn required(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let needed = value.expect_array()?;
        if instance.as_object().is_none() {
            return Ok(true);
        }

        for name in needed {
            if instance.get(name.expect_str()?).is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn count_properties(
        &self,
        value: &Node,
        instance: &Node,
        check: impl Fn(f64, f64) -> bool,
    ) -> Result<bool, Error> {
        let bound = value.expect_f64()?;
        Ok(instance
            .as_object()
            .map_or(true, |members| check(members.len() as f64, bound)))
    }

    fn prefix_items(
        &mut self,
        value: &Node,
        instance: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let prefixes = value.expect_array()?;
        let Some(items) = instance.as_array() else {
            return Ok(true);
        };

        let mut valid = true;
        for (sub, item) in prefixes.iter().zip(items.iter()) {
            valid = self.apply(sub, item, errors)? && valid;
        }
        Ok(valid)
    }

    // "items" picks up where the sibling "prefixItems" (if any) left off.
    fn items(
        &mut self,
        value: &Node,
        instance: &Node,
        parent: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let Some(items) = instance.as_array() else {
            return Ok(true);
        };
        let skip = match parent.get(keywords::PREFIX_ITEMS) {
            Some(prefixes) => prefixes.expect_array()?.len(),
            None => 0,
        };

        let mut valid = true;
        for item in items.iter().skip(skip) {
            valid = self.apply(value, item, errors)? && valid;
        }
        Ok(valid)
    }

    // Count matching items against the sibling "minContains" (default 1)
    // and "maxContains" (default unbounded). Attempt errors accumulate.
    fn contains(
        &mut self,
        value: &Node,
        instance: &Node,
        parent: &Node,
        errors: &mut Vec<OutputUnit>,
    ) -> Result<bool, Error> {
        let Some(items) = instance.as_array() else {
            return Ok(true);
        };
        let min = match parent.get(keywords::MIN_CONTAINS) {
            Some(bound) => bound.expect_f64()?,
            None => 1.0,
        };
        let max = match parent.get(keywords::MAX_CONTAINS) {
            Some(bound) => bound.expect_f64()?,
            None => f64::INFINITY,
        };

        let mut matched = 0usize;
        for item in items {
            if self.apply(value, item, errors)? {
                matched += 1;
            }
        }
        Ok(matched as f64 >= min && matched as f64 <= max)
    }

    fn count_items(
        &self,
        value: &Node,
        instance: &Node,
        check: impl Fn(f64, f64) -> bool,
    ) -> Result<bool, Error> {
        let bound = value.expect_f64()?;
        Ok(instance
            .as_array()
            .map_or(true, |items| check(items.len() as f64, bound)))
    }

    fn unique_items(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let unique = value.expect_bool()?;
        let Some(items) = instance.as_array() else {
            return Ok(true);
        };
        if !unique {
            return Ok(true);
        }

        let mut seen = HashSet::default();
        Ok(items.iter().all(|item| seen.insert(canonicalize(item))))
    }

    fn type_(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let names = match value {
            Node::String { .. } => std::slice::from_ref(value),
            Node::Array { items, .. } => items.as_slice(),
            other => {
                return Err(Error::InvalidSchema {
                    location: other.location().to_string(),
                    expected: "a type or array of types",
                })
            }
        };

        let mut matched = false;
        for name in names {
            matched = type_matches(name.expect_str()?, name.location(), instance)? || matched;
        }
        Ok(matched)
    }

    fn enum_(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let variants = value.expect_array()?;
        let instance = canonicalize(instance);
        Ok(variants.iter().any(|v| canonicalize(v) == instance))
    }

    fn compare(
        &self,
        value: &Node,
        instance: &Node,
        check: impl Fn(f64, f64) -> bool,
    ) -> Result<bool, Error> {
        let bound = value.expect_f64()?;
        Ok(instance.as_f64().map_or(true, |n| check(n, bound)))
    }

    // An inexact division leaves a remainder near zero or near the divisor
    // itself; either means "multiple" under the float tolerance.
    fn multiple_of(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let divisor = value.expect_f64()?;
        let Some(n) = instance.as_f64() else {
            return Ok(true);
        };

        let remainder = (n % divisor).abs();
        Ok(remainder <= MULTIPLE_OF_EPSILON
            || (remainder - divisor.abs()).abs() <= MULTIPLE_OF_EPSILON)
    }

    // Lengths count Unicode scalar values, not bytes or UTF-16 units.
    fn length(
        &self,
        value: &Node,
        instance: &Node,
        check: impl Fn(f64, f64) -> bool,
    ) -> Result<bool, Error> {
        let bound = value.expect_f64()?;
        Ok(instance
            .as_str()
            .map_or(true, |s| check(s.chars().count() as f64, bound)))
    }

    fn pattern(&self, value: &Node, instance: &Node) -> Result<bool, Error> {
        let re = compile_pattern(value.expect_str()?, value.location())?;
        Ok(instance.as_str().map_or(true, |s| re.is_match(s)))
    }
}

fn type_matches(name: &str, location: &str, instance: &Node) -> Result<bool, Error> {
    Ok(match name {
        "null" => matches!(instance, Node::Null { .. }),
        "boolean" => matches!(instance, Node::Bool { .. }),
        "number" => matches!(instance, Node::Number { .. }),
        // "integer" admits any number with a zero fractional part.
        "integer" => matches!(instance, Node::Number { value, .. } if value.fract() == 0.0),
        "string" => matches!(instance, Node::String { .. }),
        "array" => matches!(instance, Node::Array { .. }),
        "object" => matches!(instance, Node::Object { .. }),
        _ => {
            return Err(Error::InvalidSchema {
                location: location.to_string(),
                expected: "a JSON type name",
            })
        }
    })
}

fn compile_pattern(pattern: &str, location: &str) -> Result<regex::Regex, Error> {
    regex::Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        location: location.to_string(),
        source: Box::new(source),
    })
}

fn split_fragment(mut url: url::Url) -> (String, String) {
    let fragment = url.fragment().unwrap_or("").to_string();
    url.set_fragment(None);
    (url.to_string(), fragment)
}
