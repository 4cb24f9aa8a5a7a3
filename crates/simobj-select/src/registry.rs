//! Per-keytype mask functions and their memoized selectors.
//!
//! A [`MaskRegistry`] maps each keytype to a [`MaskSpec`]: a mask function
//! plus the auxiliary fields it reads. [`resolve`](MaskRegistry::resolve)
//! invokes the function the first time a keytype is requested and caches
//! the resulting [`Selector`]; later requests return the cached copy.
//!
//! Mask functions may ask for other keytypes' selectors through their
//! [`MaskContext`]. Resolution keeps a stack of keytypes in progress and
//! fails with [`FieldError::MaskCycle`] if a keytype is requested while it
//! is still being computed.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use simobj_core::source::fetch;
use simobj_core::{FieldError, FieldSource, Identifier, KeyType, MaskArgs, Param, Selector, Value};

/// Signature of a mask function.
pub type MaskFn = dyn Fn(&mut MaskContext<'_>) -> Result<Selector, FieldError> + Send + Sync;

/// A mask function and the auxiliary fields it declares.
///
/// Declared fields are loaded into the source before the function runs and
/// released afterwards, whether or not the function succeeds. Read them
/// with [`MaskContext::val`].
#[derive(Clone)]
pub struct MaskSpec {
    uses: Vec<String>,
    func: Arc<MaskFn>,
}

impl MaskSpec {
    /// Wrap a mask function with no declared auxiliary fields.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut MaskContext<'_>) -> Result<Selector, FieldError> + Send + Sync + 'static,
    {
        Self {
            uses: Vec::new(),
            func: Arc::new(func),
        }
    }

    /// A mask that always returns `selector`.
    pub fn fixed(selector: Selector) -> Self {
        Self::new(move |_| Ok(selector.clone()))
    }

    /// Declare auxiliary fields read by the function.
    pub fn uses(mut self, fields: &[&str]) -> Self {
        self.uses.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// The declared auxiliary fields.
    pub fn used_fields(&self) -> &[String] {
        &self.uses
    }
}

impl fmt::Debug for MaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskSpec")
            .field("uses", &self.uses)
            .finish_non_exhaustive()
    }
}

/// Mask configuration for one keytype.
#[derive(Clone, Debug)]
pub enum MaskChoice {
    /// The same mask for every mask type.
    Fixed(MaskSpec),
    /// One mask per mask type (e.g. `"fofsub"`, `"aperture"`).
    PerType(IndexMap<String, MaskSpec>),
}

impl MaskChoice {
    /// The mask to use for `mask_type`, if any.
    pub fn for_type(&self, mask_type: Option<&str>) -> Option<&MaskSpec> {
        match self {
            Self::Fixed(spec) => Some(spec),
            Self::PerType(table) => mask_type.and_then(|t| table.get(t)),
        }
    }
}

/// Memoized per-keytype selectors for one object.
pub struct MaskRegistry {
    object: Identifier,
    args: MaskArgs,
    specs: IndexMap<KeyType, MaskSpec>,
    resolved: IndexMap<KeyType, Selector>,
    in_progress: Vec<KeyType>,
}

impl MaskRegistry {
    /// An empty registry for `object` with mask arguments `args`.
    pub fn new(object: Identifier, args: MaskArgs) -> Self {
        Self {
            object,
            args,
            specs: IndexMap::new(),
            resolved: IndexMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Register (or replace) the mask for `keytype`.
    ///
    /// A selector already resolved for `keytype` is kept.
    pub fn register(&mut self, keytype: impl Into<KeyType>, spec: MaskSpec) {
        self.specs.insert(keytype.into(), spec);
    }

    /// Seed resolved selectors, e.g. from a cache entry.
    pub fn restore(&mut self, resolved: IndexMap<KeyType, Selector>) {
        self.resolved.extend(resolved);
    }

    /// The object this registry selects.
    pub fn object(&self) -> &Identifier {
        &self.object
    }

    /// Mask arguments passed to every mask function.
    pub fn args(&self) -> &MaskArgs {
        &self.args
    }

    /// Keytypes with a registered mask, in registration order.
    pub fn keytypes(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Whether `keytype` has a registered mask.
    pub fn has_mask(&self, keytype: &str) -> bool {
        self.specs.contains_key(keytype)
    }

    /// The cached selector for `keytype`, without computing it.
    pub fn get(&self, keytype: &str) -> Option<&Selector> {
        self.resolved.get(keytype)
    }

    /// Every selector resolved so far.
    pub fn resolved(&self) -> &IndexMap<KeyType, Selector> {
        &self.resolved
    }

    /// The selector for `keytype`, computing it on first use.
    ///
    /// Fails with [`FieldError::NoMaskDefined`] if no mask is registered,
    /// [`FieldError::MaskCycle`] if the keytype is already being resolved,
    /// or whatever the mask function returns. Failures are not cached.
    pub fn resolve(
        &mut self,
        keytype: &str,
        source: &mut dyn FieldSource,
    ) -> Result<&Selector, FieldError> {
        let index = match self.resolved.get_index_of(keytype) {
            Some(i) => i,
            None => {
                let selector = self.compute(keytype, source)?;
                debug!(keytype, %selector, "mask resolved");
                self.resolved.insert_full(keytype.to_string(), selector).0
            }
        };
        Ok(&self.resolved[index])
    }

    fn compute(&mut self, keytype: &str, source: &mut dyn FieldSource) -> Result<Selector, FieldError> {
        if self.in_progress.iter().any(|k| k == keytype) {
            let mut chain = self.in_progress.clone();
            chain.push(keytype.to_string());
            return Err(FieldError::MaskCycle { chain });
        }
        let spec = self
            .specs
            .get(keytype)
            .cloned()
            .ok_or_else(|| FieldError::NoMaskDefined {
                keytype: keytype.to_string(),
            })?;

        self.in_progress.push(keytype.to_string());
        let result = self.invoke(&spec, source);
        self.in_progress.pop();
        result
    }

    fn invoke(&mut self, spec: &MaskSpec, source: &mut dyn FieldSource) -> Result<Selector, FieldError> {
        let mut fresh = Vec::new();
        let mut result = Ok(());
        for key in &spec.uses {
            match source.load(&[key.as_str()], None) {
                Ok(loaded) => fresh.extend(loaded),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        let outcome = match result {
            Ok(()) => {
                let mut ctx = MaskContext {
                    registry: self,
                    source: &mut *source,
                };
                (spec.func)(&mut ctx)
            }
            Err(e) => Err(e),
        };

        if !source.share_mode() {
            for key in &fresh {
                source.release(key);
            }
        }
        outcome
    }
}

impl fmt::Debug for MaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskRegistry")
            .field("object", &self.object)
            .field("keytypes", &self.specs.keys().collect::<Vec<_>>())
            .field("resolved", &self.resolved.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What a mask function can see while it runs.
pub struct MaskContext<'a> {
    registry: &'a mut MaskRegistry,
    source: &'a mut dyn FieldSource,
}

impl MaskContext<'_> {
    /// Identifier of the object being selected.
    pub fn object(&self) -> &Identifier {
        &self.registry.object
    }

    /// Mask arguments.
    pub fn args(&self) -> &MaskArgs {
        &self.registry.args
    }

    /// A keyword mask argument.
    pub fn kwarg(&self, name: &str) -> Option<&Param> {
        self.registry.args.kwarg(name)
    }

    /// An integer component of the object identifier.
    pub fn object_int(&self, name: &str) -> Result<i64, FieldError> {
        self.registry
            .object
            .int(name)
            .ok_or_else(|| FieldError::MaskFailed {
                reason: format!("object identifier has no integer component '{name}'"),
            })
    }

    /// A declared auxiliary field, as currently loaded in the source.
    pub fn val(&self, key: &str) -> Result<&Value, FieldError> {
        self.source.value(key).ok_or_else(|| FieldError::MaskFailed {
            reason: format!("auxiliary field '{key}' is not loaded; declare it with uses()"),
        })
    }

    /// The whole unmasked field, fetched for this call only.
    pub fn raw(&mut self, key: &str) -> Result<Value, FieldError> {
        fetch(self.source, key, None)
    }

    /// The field with its own keytype's selector applied.
    pub fn masked(&mut self, key: &str) -> Result<Value, FieldError> {
        let keytype = self.keytype_of(key)?;
        let selector = self.selector(&keytype)?;
        self.raw(key)?.select(&selector)
    }

    /// Resolve another keytype's selector.
    pub fn selector(&mut self, keytype: &str) -> Result<Selector, FieldError> {
        self.registry
            .resolve(keytype, &mut *self.source)
            .cloned()
    }

    /// Keytype of a source field.
    pub fn keytype_of(&self, key: &str) -> Result<KeyType, FieldError> {
        self.source
            .metadata(key)
            .map(|m| m.keytype)
            .ok_or_else(|| FieldError::UnknownField {
                name: key.to_string(),
            })
    }
}
