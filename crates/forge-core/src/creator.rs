// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Creation capabilities and the registry that dispatches to them.
//!
//! A capability is bound to exactly one [`ComponentKind`] through its
//! associated `Kind` type. The registry indexes capabilities by the kind's
//! [`VariantId`], so adding a variant means adding a capability; the
//! dispatcher itself never changes.
//!
//! Capabilities reach the registry in two ways:
//! - explicitly, via [`CreatorRegistry::builder`];
//! - structurally, by self-registering with [`crate::register_creator!`] and
//!   being picked up by [`CreatorRegistry::discovered`], which scans the
//!   registrations once per document type and caches the result.
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::component::{Component, ComponentKind};
use crate::document::{Document, DocumentError, Handle};
use crate::ident::VariantId;
use crate::tx::TxId;

/// Inputs handed to a capability for one creation.
pub struct CreateContext<'a, D> {
    /// Component being materialised.
    pub component: &'a Component,
    /// Target document, under the open transaction.
    pub document: &'a mut D,
    /// The open transaction.
    pub tx: TxId,
    /// Resolved reference handle, when the capability wants one and the
    /// caller requested reference use.
    pub reference: Option<Handle>,
}

/// Error raised by a creation capability.
#[derive(Debug, Error)]
pub enum CreationError {
    /// The component's attributes are not of the capability's kind.
    #[error("attributes are not of variant `{expected}`")]
    AttributeMismatch {
        /// Variant the capability is bound to.
        expected: &'static str,
    },
    /// The capability needed a reference handle and none was supplied.
    #[error("reference handle required")]
    ReferenceRequired,
    /// A native document primitive failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Capability-specific failure, surfaced unchanged.
    #[error(transparent)]
    Capability(Box<dyn std::error::Error + Send + Sync>),
}

impl CreationError {
    /// Wraps a capability-specific error.
    pub fn capability<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Capability(Box::new(err))
    }
}

/// Variant-specific logic that turns a component into a document object.
///
/// Contract:
/// - `create` returns `Ok(Some(handle))` for a new object, `Ok(None)` when
///   it declines to create anything (not an error).
/// - All document mutations go through `cx.document` under `cx.tx`; they
///   become durable only if the whole build attempt commits.
pub trait Creator<D: Document>: Send + Sync + 'static {
    /// Variant this capability is bound to.
    type Kind: ComponentKind;

    /// Whether `create` consumes a resolved reference handle.
    const WANTS_REFERENCE: bool = false;

    /// Creates the native object for `attributes`.
    ///
    /// # Errors
    /// Any failure aborts the build attempt and is reported as
    /// `CreationFailed`.
    fn create(
        &self,
        cx: CreateContext<'_, D>,
        attributes: &Self::Kind,
    ) -> Result<Option<Handle>, CreationError>;
}

/// Object-safe view of a [`Creator`] used by the registry.
pub trait ErasedCreator<D>: Send + Sync {
    /// Variant handled by this capability.
    fn variant(&self) -> VariantId;
    /// Variant name for diagnostics.
    fn variant_name(&self) -> &'static str;
    /// Type name of the capability.
    fn creator_name(&self) -> &'static str;
    /// Whether the capability consumes a resolved reference handle.
    fn wants_reference(&self) -> bool;
    /// Downcasts the component attributes and invokes the capability.
    ///
    /// # Errors
    /// Returns [`CreationError::AttributeMismatch`] when the component is not
    /// of the bound variant, or the capability's own error.
    fn create_erased(&self, cx: CreateContext<'_, D>) -> Result<Option<Handle>, CreationError>;
}

struct ErasedCreatorImpl<D, C> {
    creator: C,
    _marker: PhantomData<fn(D)>,
}

impl<D, C> ErasedCreator<D> for ErasedCreatorImpl<D, C>
where
    D: Document,
    C: Creator<D>,
{
    fn variant(&self) -> VariantId {
        C::Kind::variant_id()
    }

    fn variant_name(&self) -> &'static str {
        C::Kind::NAME
    }

    fn creator_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn wants_reference(&self) -> bool {
        C::WANTS_REFERENCE
    }

    fn create_erased(&self, cx: CreateContext<'_, D>) -> Result<Option<Handle>, CreationError> {
        let Some(attributes) = cx.component.attributes::<C::Kind>() else {
            return Err(CreationError::AttributeMismatch {
                expected: C::Kind::NAME,
            });
        };
        self.creator.create(cx, attributes)
    }
}

/// Type-erases a capability for registry storage.
pub fn erase_creator<D, C>(creator: C) -> Arc<dyn ErasedCreator<D>>
where
    D: Document,
    C: Creator<D>,
{
    Arc::new(ErasedCreatorImpl {
        creator,
        _marker: PhantomData,
    })
}

/// Errors returned when resolving a capability for a variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No capability is bound to the variant.
    #[error("no creator registered for variant `{variant}`")]
    NoCreatorFound {
        /// Variant name taken from the component.
        variant: &'static str,
    },
    /// More than one capability is bound to the variant.
    #[error("ambiguous creators for variant `{variant}`: {candidates:?}")]
    AmbiguousCreator {
        /// Variant name taken from the component.
        variant: &'static str,
        /// Type names of the competing capabilities.
        candidates: Vec<&'static str>,
    },
}

/// Maps variants to creation capabilities for documents of type `D`.
pub struct CreatorRegistry<D> {
    creators: FxHashMap<VariantId, Vec<Arc<dyn ErasedCreator<D>>>>,
}

impl<D: Document> CreatorRegistry<D> {
    /// Starts an explicit registry.
    #[must_use]
    pub fn builder() -> CreatorRegistryBuilder<D> {
        CreatorRegistryBuilder {
            registry: Self {
                creators: FxHashMap::default(),
            },
        }
    }

    /// Returns the registry of self-registered capabilities for `D`.
    ///
    /// The registrations are scanned on first use and the result is cached
    /// for the rest of the process.
    #[must_use]
    pub fn discovered() -> Arc<Self> {
        static CACHE: Lazy<Mutex<FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
            Lazy::new(|| Mutex::new(FxHashMap::default()));

        let mut cache = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache
            .get(&TypeId::of::<D>())
            .and_then(|entry| Arc::clone(entry).downcast::<Self>().ok())
        {
            return hit;
        }
        let registry = Arc::new(Self::scan());
        cache.insert(TypeId::of::<D>(), registry.clone());
        registry
    }

    fn scan() -> Self {
        let mut builder = Self::builder();
        for registration in inventory::iter::<CreatorRegistration> {
            if (registration.document)() != TypeId::of::<D>() {
                continue;
            }
            if let Ok(creator) = (registration.factory)().downcast::<Arc<dyn ErasedCreator<D>>>() {
                builder = builder.with_erased(*creator);
            }
        }
        let registry = builder.build();
        for (variant, creators) in &registry.creators {
            for creator in creators {
                tracing::trace!(
                    variant = creator.variant_name(),
                    variant_id = %variant.short(),
                    creator = creator.creator_name(),
                    "discovered creator"
                );
            }
        }
        tracing::debug!(
            document = std::any::type_name::<D>(),
            variants = registry.creators.len(),
            "discovered creators"
        );
        registry
    }

    /// Returns the single capability bound to `variant`.
    ///
    /// `name` is only used to label errors.
    ///
    /// # Errors
    /// - [`DispatchError::NoCreatorFound`] when nothing is bound.
    /// - [`DispatchError::AmbiguousCreator`] when more than one is bound.
    pub fn resolve(
        &self,
        variant: VariantId,
        name: &'static str,
    ) -> Result<&Arc<dyn ErasedCreator<D>>, DispatchError> {
        match self.creators.get(&variant).map(Vec::as_slice) {
            None | Some([]) => Err(DispatchError::NoCreatorFound { variant: name }),
            Some([single]) => Ok(single),
            Some(many) => Err(DispatchError::AmbiguousCreator {
                variant: name,
                candidates: many.iter().map(|c| c.creator_name()).collect(),
            }),
        }
    }

    /// Returns the capability for a component's variant.
    ///
    /// # Errors
    /// See [`CreatorRegistry::resolve`].
    pub fn resolve_for(
        &self,
        component: &Component,
    ) -> Result<&Arc<dyn ErasedCreator<D>>, DispatchError> {
        self.resolve(component.variant(), component.variant_name())
    }

    /// Registered variant names, sorted.
    #[must_use]
    pub fn variants(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .creators
            .values()
            .filter_map(|v| v.first().map(|c| c.variant_name()))
            .collect();
        names.sort_unstable();
        names
    }
}

/// Builder for [`CreatorRegistry`].
pub struct CreatorRegistryBuilder<D> {
    registry: CreatorRegistry<D>,
}

impl<D: Document> CreatorRegistryBuilder<D> {
    /// Adds a capability.
    ///
    /// Binding two capabilities to the same variant is accepted here and
    /// reported as [`DispatchError::AmbiguousCreator`] when that variant is
    /// resolved.
    #[must_use]
    pub fn with<C: Creator<D>>(self, creator: C) -> Self {
        self.with_erased(erase_creator(creator))
    }

    /// Adds an already type-erased capability.
    #[must_use]
    pub fn with_erased(mut self, creator: Arc<dyn ErasedCreator<D>>) -> Self {
        self.registry
            .creators
            .entry(creator.variant())
            .or_default()
            .push(creator);
        self
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> CreatorRegistry<D> {
        self.registry
    }
}

/// Self-registration record collected with `inventory`.
///
/// Use [`crate::register_creator!`] rather than building this by hand.
pub struct CreatorRegistration {
    /// Returns the `TypeId` of the document type the capability targets.
    pub document: fn() -> TypeId,
    /// Produces a boxed `Arc<dyn ErasedCreator<D>>`.
    pub factory: fn() -> Box<dyn Any + Send + Sync>,
}

inventory::collect!(CreatorRegistration);

/// Registers a creation capability for discovery by
/// [`CreatorRegistry::discovered`].
///
/// ```ignore
/// forge_core::register_creator!(MemoryDocument, LineCreator);
/// ```
#[macro_export]
macro_rules! register_creator {
    ($doc:ty, $creator:expr) => {
        $crate::inventory::submit! {
            $crate::CreatorRegistration {
                document: ::std::any::TypeId::of::<$doc>,
                factory: || {
                    ::std::boxed::Box::new($crate::erase_creator::<$doc, _>($creator))
                        as ::std::boxed::Box<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync>
                },
            }
        }
    };
}
