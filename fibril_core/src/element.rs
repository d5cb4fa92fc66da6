// Copyright 2026 the Fibril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree descriptions handed to the reconciler.
//!
//! A description is an immutable value: an [`Element`] names a host type, a
//! component, or a fragment, and carries [`Props`] whose `children` field is
//! itself a [`Child`] description. Descriptions are cheap to clone; props are
//! shared behind an `Rc` so cloning a child list copies handles, not trees.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::RenderError;
use crate::hooks::Hooks;

/// Identity of a child among its siblings.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// A string key.
    Str(Rc<str>),
    /// An integer key.
    Int(i64),
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "Key({s:?})"),
            Self::Int(i) => write!(f, "Key({i})"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Self::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

/// An event handler stored in a host attribute.
///
/// Handlers compare by identity, so re-rendering with the same handler value
/// is not an attribute change.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn()>);

impl Handler {
    /// Wraps a callback.
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the callback.
    pub fn call(&self) {
        (self.0)();
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// A host attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// String value.
    Str(Rc<str>),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Event handler.
    Handler(Handler),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Handler(_) => f.write_str("[handler]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Str(s.into())
    }
}

impl From<i64> for PropValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for PropValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Handler> for PropValue {
    fn from(h: Handler) -> Self {
        Self::Handler(h)
    }
}

/// Named attributes plus a child description.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attrs: BTreeMap<Rc<str>, PropValue>,
    /// The nested child description.
    pub children: Child,
}

impl Props {
    /// Creates empty props.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attrs.get(name)
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<PropValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Iterates attributes in name order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attrs.iter().map(|(k, v)| (&**k, v))
    }

    /// Returns `true` if both prop sets carry the same attributes.
    ///
    /// Children are not compared; they are reconciled separately.
    #[must_use]
    pub fn attrs_eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs
    }
}

/// The signature of a component render function.
pub type RenderFn = dyn Fn(&Props, &mut Hooks<'_>) -> Result<Child, RenderError>;

/// A function component.
///
/// Components compare by identity: two `Component` values are the same type
/// only if they were cloned from the same [`Component::new`] call.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    render: Rc<RenderFn>,
}

impl Component {
    /// Creates a component from a render function.
    pub fn new(
        name: &'static str,
        render: impl Fn(&Props, &mut Hooks<'_>) -> Result<Child, RenderError> + 'static,
    ) -> Self {
        Self {
            name,
            render: Rc::new(render),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the render function.
    pub fn render(&self, props: &Props, hooks: &mut Hooks<'_>) -> Result<Child, RenderError> {
        (self.render)(props, hooks)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

/// What an element renders as.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    /// A host output node with the given tag.
    Host(Rc<str>),
    /// A function component.
    Component(Component),
    /// A transparent grouping of its children.
    Fragment,
}

/// One node of a description tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// Element type.
    pub ty: ElementType,
    /// Optional sibling identity.
    pub key: Option<Key>,
    /// Attributes and children.
    pub props: Rc<Props>,
}

impl Element {
    fn with_type(ty: ElementType) -> Self {
        Self {
            ty,
            key: None,
            props: Rc::default(),
        }
    }

    /// A host element with tag `tag`.
    #[must_use]
    pub fn host(tag: &str) -> Self {
        Self::with_type(ElementType::Host(tag.into()))
    }

    /// An element that renders `component`.
    #[must_use]
    pub fn component(component: &Component) -> Self {
        Self::with_type(ElementType::Component(component.clone()))
    }

    /// A fragment grouping `children`.
    #[must_use]
    pub fn fragment(children: impl Into<Child>) -> Self {
        Self::with_type(ElementType::Fragment).children(children)
    }

    /// Sets the key.
    #[must_use]
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        Rc::make_mut(&mut self.props).set(name, value);
        self
    }

    /// Replaces the children.
    #[must_use]
    pub fn children(mut self, children: impl Into<Child>) -> Self {
        Rc::make_mut(&mut self.props).children = children.into();
        self
    }

    /// Appends one child.
    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        let props = Rc::make_mut(&mut self.props);
        let children = core::mem::take(&mut props.children);
        props.children = match children {
            Child::Empty => child.into(),
            Child::List(mut list) => {
                list.push(child.into());
                Child::List(list)
            }
            single => Child::List(alloc::vec![single, child.into()]),
        };
        self
    }
}

/// A child description.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Child {
    /// Renders nothing.
    #[default]
    Empty,
    /// A single element.
    Element(Element),
    /// A text node.
    Text(Rc<str>),
    /// An ordered list of children.
    List(Vec<Self>),
}

impl Child {
    /// A text child rendered from any displayable value.
    pub fn text(value: impl fmt::Display) -> Self {
        Self::Text(value.to_string().into())
    }
}

impl From<Element> for Child {
    fn from(e: Element) -> Self {
        Self::Element(e)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Self::Text(s.into())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Self::Text(s.into())
    }
}

impl From<i64> for Child {
    fn from(i: i64) -> Self {
        Self::text(i)
    }
}

impl From<i32> for Child {
    fn from(i: i32) -> Self {
        Self::text(i)
    }
}

impl From<Vec<Self>> for Child {
    fn from(list: Vec<Self>) -> Self {
        Self::List(list)
    }
}

impl From<Vec<Element>> for Child {
    fn from(list: Vec<Element>) -> Self {
        Self::List(list.into_iter().map(Self::Element).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Child {
    fn from(child: Option<T>) -> Self {
        child.map_or(Self::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_appends_build_a_list() {
        let e = Element::host("ul").child("a").child("b").child(1);
        assert_eq!(
            e.props.children,
            Child::List(alloc::vec![
                Child::Text("a".into()),
                Child::Text("b".into()),
                Child::Text("1".into()),
            ]),
            "three text children"
        );
    }

    #[test]
    fn components_compare_by_identity() {
        let a = Component::new("A", |_, _| Ok(Child::Empty));
        let b = Component::new("A", |_, _| Ok(Child::Empty));
        assert_eq!(a, a.clone(), "clone is the same type");
        assert_ne!(a, b, "same name, different component");
    }

    #[test]
    fn handlers_compare_by_identity() {
        let h = Handler::new(|| {});
        let same = Element::host("b").attr("onClick", h.clone());
        let again = Element::host("b").attr("onClick", h);
        let other = Element::host("b").attr("onClick", Handler::new(|| {}));
        assert!(same.props.attrs_eq(&again.props), "same handler");
        assert!(!same.props.attrs_eq(&other.props), "fresh handler");
    }
}
