//! C3 — field sets: ordered, lazily materialized composites whose children
//! are produced by a user-supplied generator (spec §4.3).
//!
//! Rust has no native suspendable generator on stable, so per spec §9's
//! re-architecture guidance this is a pull iterator: [`FieldGenerator`] is
//! driven one child at a time and keeps whatever state it needs between
//! calls. [`FnGenerator`] adapts an ordinary `FnMut` closure (the common
//! case — a closure capturing its own step counter/locals) into one.

use crate::endian::Endian;
use crate::error::{Error, FieldError, StreamError};
use crate::field::{primitive, DisplayKind, LeafField};
use crate::settings::Settings;
use crate::stream::{Charset, InputStream};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

/// A node in the field tree: either a leaf primitive or a nested field set.
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(LeafField),
    Set(Rc<FieldSet>),
}

impl Node {
    pub fn name(&self) -> String {
        match self {
            Node::Leaf(f) => f.name().to_owned(),
            Node::Set(s) => s.name(),
        }
    }

    pub fn addr(&self) -> u64 {
        match self {
            Node::Leaf(f) => f.addr(),
            Node::Set(s) => s.addr(),
        }
    }

    /// `None` means "not yet known" (an incomplete field set with no
    /// explicit size).
    pub fn size_bits(&self) -> Option<u64> {
        match self {
            Node::Leaf(f) => Some(f.size_bits()),
            Node::Set(s) => s.size_bits(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Node::Leaf(f) => f.value().clone(),
            Node::Set(_) => Value::FieldSet,
        }
    }

    pub fn raw_display(&self) -> String {
        match self {
            Node::Leaf(f) => f.raw_display().to_owned(),
            Node::Set(s) => format!("<field set, {} children>", s.materialized_len()),
        }
    }

    pub fn human_display(&self) -> String {
        match self {
            Node::Leaf(f) => f.human_display().to_owned(),
            Node::Set(s) => s.raw_display_owned(),
        }
    }

    pub fn as_field_set(&self) -> Option<&Rc<FieldSet>> {
        match self {
            Node::Set(s) => Some(s),
            Node::Leaf(_) => None,
        }
    }

    fn rename(&mut self, new_name: String) {
        match self {
            Node::Leaf(f) => f.meta_mut().name = new_name,
            Node::Set(s) => *s.name.borrow_mut() = new_name,
        }
    }
}

/// A pull-based producer of a field set's children. Implementors keep
/// whatever progress state they need; `next` must be idempotent in the
/// sense that re-deriving child `k` without calling `next` again returns
/// the same already-materialized node (the field set, not the generator,
/// is responsible for that memoization).
pub trait FieldGenerator {
    /// Produce the next child, or `Ok(None)` once there are no more.
    /// `name` may end in `"[]"` to request array auto-numbering.
    fn next(&mut self, ctx: &GenCtx) -> Result<Option<Node>, Error>;
}

/// Adapts an `FnMut(&GenCtx) -> Result<Option<Node>, Error>` closure into a
/// [`FieldGenerator`] — the ergonomic way most format authors will write
/// one, closing over their own step state.
pub struct FnGenerator<F>(F);

impl<F> FnGenerator<F>
where
    F: FnMut(&GenCtx) -> Result<Option<Node>, Error>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> FieldGenerator for FnGenerator<F>
where
    F: FnMut(&GenCtx) -> Result<Option<Node>, Error>,
{
    fn next(&mut self, ctx: &GenCtx) -> Result<Option<Node>, Error> {
        (self.0)(ctx)
    }
}

/// Context passed to a generator on every call: where to read next, the
/// inherited endianness/settings, and read-only access to already-yielded
/// siblings.
pub struct GenCtx {
    stream: Rc<InputStream>,
    addr: u64,
    endian: Endian,
    settings: Settings,
    siblings: Vec<Rc<Node>>,
    enclosing: Weak<FieldSet>,
}

impl GenCtx {
    pub fn stream(&self) -> &InputStream {
        &self.stream
    }

    /// Absolute bit address the next child will start at.
    pub fn addr(&self) -> u64 {
        self.addr
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Looks up an already-yielded sibling by its final name (after array
    /// auto-numbering), letting a generator's later children depend on
    /// earlier ones' decoded values (spec §4.3, §6).
    pub fn sibling(&self, name: &str) -> Option<Value> {
        self.siblings.iter().find(|n| n.name() == name).map(|n| n.value())
    }

    // --- convenience wrappers over `field::primitive`, bound to this
    // context's current address/endian/settings ---

    pub fn bit(&self, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::bit(&self.stream, self.addr, name, self.settings)?))
    }

    pub fn bits(&self, n: u8, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::bits(&self.stream, self.addr, n, name, self.settings)?))
    }

    pub fn uint(&self, n: u8, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::integer(
            &self.stream,
            self.addr,
            n,
            false,
            self.endian,
            name,
            self.settings,
        )?))
    }

    pub fn int(&self, n: u8, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::integer(
            &self.stream,
            self.addr,
            n,
            true,
            self.endian,
            name,
            self.settings,
        )?))
    }

    pub fn uint_endian(&self, n: u8, endian: Endian, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::integer(
            &self.stream,
            self.addr,
            n,
            false,
            endian,
            name,
            self.settings,
        )?))
    }

    pub fn int_endian(&self, n: u8, endian: Endian, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::integer(
            &self.stream,
            self.addr,
            n,
            true,
            endian,
            name,
            self.settings,
        )?))
    }

    pub fn null_bytes(&self, n: u64, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::null_bytes(&self.stream, self.addr, n, name, self.settings)?))
    }

    pub fn null_bits(&self, n: u8, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::null_bits(&self.stream, self.addr, n, name, self.settings)?))
    }

    pub fn raw_bytes(&self, n: u64, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::raw_bytes(&self.stream, self.addr, n, name, self.settings)?))
    }

    pub fn string(
        &self,
        length: u64,
        charset: Charset,
        strip: Option<&str>,
        name: impl Into<String>,
    ) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::string(
            &self.stream,
            self.addr,
            length,
            charset,
            strip,
            name,
            self.settings,
        )?))
    }

    pub fn cstring(&self, charset: Charset, name: impl Into<String>) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::cstring(&self.stream, self.addr, charset, name, self.settings)?))
    }

    pub fn pascal_string(
        &self,
        width: u8,
        charset: Charset,
        name: impl Into<String>,
    ) -> Result<Node, Error> {
        Ok(Node::Leaf(primitive::pascal_string(
            &self.stream,
            self.addr,
            width,
            charset,
            self.endian,
            name,
            self.settings,
        )?))
    }

    pub fn with_display(&self, node: Node, display: DisplayKind) -> Node {
        match node {
            Node::Leaf(f) => Node::Leaf(f.with_display(display)),
            set @ Node::Set(_) => set,
        }
    }

    /// Nests a fixed composite built from `descriptors` (spec §4.2
    /// `StaticFieldSet`): every leaf is constructed up front, in order, at
    /// the current address, rather than lazily via a hand-written
    /// generator — the right tool when a composite's fields never depend
    /// on stream content. The returned field set is already complete.
    pub fn static_field_set(
        &self,
        name: impl Into<String>,
        endian: Option<Endian>,
        descriptors: Vec<primitive::StaticFieldDescriptor>,
    ) -> Result<Node, Error> {
        let (fields, total_bits) =
            primitive::static_field_set(&self.stream, self.addr, self.settings, &descriptors)?;
        let mut remaining: VecDeque<LeafField> = fields.into();
        Ok(self.field_set(
            name,
            endian,
            Some(total_bits),
            Box::new(FnGenerator::new(move |_ctx: &GenCtx| {
                Ok(remaining.pop_front().map(Node::Leaf))
            })),
        ))
    }

    /// Nests a child field set at the current address, inheriting this
    /// context's endianness unless `endian` overrides it (spec §3
    /// invariant 5).
    pub fn field_set(
        &self,
        name: impl Into<String>,
        endian: Option<Endian>,
        explicit_size_bits: Option<u64>,
        generator: Box<dyn FieldGenerator>,
    ) -> Node {
        let fs = FieldSet::new(
            name.into(),
            self.addr,
            Rc::clone(&self.stream),
            endian.unwrap_or(self.endian),
            self.settings,
            explicit_size_bits,
            generator,
        );
        *fs.parent.borrow_mut() = self.enclosing.clone();
        Node::Set(fs)
    }
}

/// A composite field: an ordered, possibly-lazy sequence of children.
pub struct FieldSet {
    name: RefCell<String>,
    addr: u64,
    stream: Rc<InputStream>,
    endian: Endian,
    settings: Settings,
    explicit_size_bits: Option<u64>,
    children: RefCell<Vec<Rc<Node>>>,
    by_name: RefCell<HashMap<String, usize>>,
    base_counters: RefCell<HashMap<String, u64>>,
    generator: RefCell<Option<Box<dyn FieldGenerator>>>,
    warnings: RefCell<Vec<String>>,
    self_weak: RefCell<Weak<FieldSet>>,
    parent: RefCell<Weak<FieldSet>>,
}

impl std::fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSet")
            .field("name", &self.name.borrow())
            .field("addr", &self.addr)
            .field("children", &self.children.borrow().len())
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl FieldSet {
    /// Builds a root or nested field set. Returns an `Rc` because the tree
    /// is shared: children hold a strong reference via [`Node::Set`] and
    /// path resolution walks back up via a weak `parent` link (spec §4.5's
    /// `..`).
    pub fn new(
        name: String,
        addr: u64,
        stream: Rc<InputStream>,
        endian: Endian,
        settings: Settings,
        explicit_size_bits: Option<u64>,
        generator: Box<dyn FieldGenerator>,
    ) -> Rc<Self> {
        let fs = Rc::new(Self {
            name: RefCell::new(name),
            addr,
            stream,
            endian,
            settings,
            explicit_size_bits,
            children: RefCell::new(Vec::new()),
            by_name: RefCell::new(HashMap::new()),
            base_counters: RefCell::new(HashMap::new()),
            generator: RefCell::new(Some(generator)),
            warnings: RefCell::new(Vec::new()),
            self_weak: RefCell::new(Weak::new()),
            parent: RefCell::new(Weak::new()),
        });
        *fs.self_weak.borrow_mut() = Rc::downgrade(&fs);
        fs
    }

    /// The enclosing field set, if any (spec §4.5's `..`).
    pub fn parent(&self) -> Option<Rc<FieldSet>> {
        self.parent.borrow().upgrade()
    }

    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub fn addr(&self) -> u64 {
        self.addr
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn stream(&self) -> &InputStream {
        &self.stream
    }

    pub fn is_complete(&self) -> bool {
        self.generator.borrow().is_none()
    }

    pub fn materialized_len(&self) -> usize {
        self.children.borrow().len()
    }

    fn accumulated_bits(&self) -> u64 {
        self.children.borrow().iter().map(|c| c.size_bits().unwrap_or(0)).sum()
    }

    /// Total size, or `None` if incomplete with no explicit size given.
    pub fn size_bits(&self) -> Option<u64> {
        if let Some(explicit) = self.explicit_size_bits {
            return Some(explicit);
        }
        if self.is_complete() {
            Some(self.accumulated_bits())
        } else {
            None
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    fn raw_display_owned(&self) -> String {
        format!("<field set, {} children>", self.materialized_len())
    }

    /// Drives the generator to produce exactly one more child, if any.
    /// Returns `Ok(false)` once the set is complete — idempotent.
    pub fn advance(&self) -> Result<bool, Error> {
        if self.is_complete() {
            return Ok(false);
        }

        let ctx = GenCtx {
            stream: Rc::clone(&self.stream),
            addr: self.addr + self.accumulated_bits(),
            endian: self.endian,
            settings: self.settings,
            siblings: self.children.borrow().clone(),
            enclosing: self.self_weak.borrow().clone(),
        };

        let produced = {
            let mut gen_slot = self.generator.borrow_mut();
            let generator = gen_slot.as_mut().expect("checked is_complete above");
            generator.next(&ctx)
        };

        match produced {
            Ok(None) => {
                *self.generator.borrow_mut() = None;
                Ok(false)
            }
            Ok(Some(mut node)) => {
                let size = node.size_bits().unwrap_or(0);
                if let Some(limit) = self.explicit_size_bits {
                    if self.accumulated_bits() + size > limit {
                        self.truncate_with_warning(format!(
                            "{}: would overflow field set of {limit} bit(s)",
                            node.name()
                        ));
                        return Ok(false);
                    }
                }

                let final_name = self.assign_name(&node.name());
                node.rename(final_name.clone());

                let mut children = self.children.borrow_mut();
                let index = children.len();
                children.push(Rc::new(node));
                drop(children);
                self.by_name.borrow_mut().insert(final_name, index);
                Ok(true)
            }
            Err(err) => {
                if is_locally_recoverable(&err) {
                    self.truncate_with_warning(format!("child production failed: {err}"));
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn truncate_with_warning(&self, message: String) {
        tracing::warn!(field_set = %self.name(), "{message}");
        self.warnings.borrow_mut().push(message);
        *self.generator.borrow_mut() = None;
    }

    /// Resolves `name[]` (ending in the literal suffix) to the next free
    /// index among siblings sharing `name`; any other name is returned
    /// unchanged (and must be unique per spec §3 invariant 4 — callers are
    /// trusted not to violate that).
    fn assign_name(&self, requested: &str) -> String {
        let Some(base) = requested.strip_suffix("[]") else {
            return requested.to_owned();
        };
        let mut counters = self.base_counters.borrow_mut();
        let idx = counters.entry(base.to_owned()).or_insert(0);
        let name = format!("{base}[{idx}]");
        *idx += 1;
        name
    }

    /// Drives the generator until it is complete.
    pub fn drive_to_completion(&self) -> Result<(), Error> {
        while self.advance()? {}
        Ok(())
    }

    /// Materializes and returns child `index`, driving the generator as
    /// needed. `Ok(None)` means the set completed with fewer children.
    pub fn child_at(&self, index: usize) -> Result<Option<Rc<Node>>, Error> {
        while self.children.borrow().len() <= index {
            if !self.advance()? {
                return Ok(None);
            }
        }
        Ok(self.children.borrow().get(index).cloned())
    }

    /// Materializes and returns the child named `name` (its final name,
    /// after any array auto-numbering), driving the generator as needed.
    pub fn child_by_name(&self, name: &str) -> Result<Option<Rc<Node>>, Error> {
        loop {
            if let Some(&idx) = self.by_name.borrow().get(name) {
                return Ok(self.children.borrow().get(idx).cloned());
            }
            if !self.advance()? {
                return Ok(None);
            }
        }
    }

    /// Highest-indexed currently materialized sibling sharing `base`,
    /// driving the generator one step if none exists yet (spec §4.5's
    /// `name[]` path semantics). Never drives past EOF: a generator error
    /// while finding the first one simply yields `None`.
    pub fn last_in_array(&self, base: &str) -> Result<Option<Rc<Node>>, Error> {
        let mut best: Option<Rc<Node>> = None;
        {
            let children = self.children.borrow();
            for child in children.iter() {
                if array_base(&child.name()).as_deref() == Some(base) {
                    best = Some(Rc::clone(child));
                }
            }
        }
        if best.is_some() {
            return Ok(best);
        }
        if self.advance()? {
            return self.last_in_array(base);
        }
        Ok(None)
    }

    /// All currently materialized children sharing `base`, in index order.
    /// Does not drive the generator further.
    pub fn materialized_array(&self, base: &str) -> Vec<Rc<Node>> {
        self.children
            .borrow()
            .iter()
            .filter(|c| array_base(&c.name()).as_deref() == Some(base))
            .cloned()
            .collect()
    }
}

fn array_base(name: &str) -> Option<String> {
    let idx = name.rfind('[')?;
    if name.ends_with(']') {
        Some(name[..idx].to_owned())
    } else {
        None
    }
}

/// A child production failure is locally recovered (truncate the set, keep
/// a warning) only when it reflects running out of well-formed data —
/// stream bounds or a field that couldn't be built from what's there. A
/// `FormatError` is a deliberate "this is not valid input" signal from the
/// generator itself (spec §4.4's `validate()` contract) and always
/// propagates to the caller instead.
fn is_locally_recoverable(err: &Error) -> bool {
    matches!(
        err,
        Error::Stream(StreamError::UnderRun { .. } | StreamError::Alignment { .. } | StreamError::Decode { .. })
            | Error::Field(FieldError::SizeOverflow { .. } | FieldError::Construction { .. } | FieldError::ImpossibleEnumMapping { .. })
    )
}
