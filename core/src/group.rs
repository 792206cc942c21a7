//! Option groups: ordered descriptors plus nested, namespaced sub-groups.

use crate::option::{OptionSpec, qualify};

/// Position of a descriptor inside a group tree: child-group indices from the
/// root group, then the index in that group's option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OptionPath {
    groups: Vec<usize>,
    index: usize,
}

/// A titled collection of options.
///
/// A group's `namespace` is prepended (dot-joined) to the long names of its
/// options and of every option in its descendants.
#[derive(Debug, Default)]
pub struct Group {
    pub heading: String,
    pub namespace: Option<String>,
    pub hidden: bool,
    pub options: Vec<OptionSpec>,
    pub groups: Vec<Group>,
}

impl Group {
    pub fn new(heading: &str) -> Self {
        Self {
            heading: heading.to_string(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Hides every option of this group and its descendants from help output.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Namespace prefix that applies inside this group, given the parent's.
    pub fn prefix_within(&self, parent: &str) -> String {
        match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => qualify(parent, ns),
            _ => parent.to_string(),
        }
    }

    /// Visits this group and its descendants in preorder. The callback gets
    /// each group with the namespace prefix of its options.
    pub fn visit<'a>(&'a self, parent: &str, f: &mut dyn FnMut(&'a Group, &str)) {
        let prefix = self.prefix_within(parent);
        f(self, &prefix);
        for group in &self.groups {
            group.visit(&prefix, f);
        }
    }

    /// Every option in the tree with its fully-qualified long name.
    pub fn all_options(&self) -> Vec<(&OptionSpec, Option<String>)> {
        let mut out = Vec::new();
        self.visit("", &mut |group, prefix| {
            for option in &group.options {
                out.push((option, option.qualified_long(prefix)));
            }
        });
        out
    }

    /// Non-hidden groups in preorder with their namespace prefixes. A hidden
    /// group hides its whole subtree.
    pub fn visible_groups(&self) -> Vec<(&Group, String)> {
        let mut out = Vec::new();
        self.collect_visible("", &mut out);
        out
    }

    fn collect_visible<'a>(&'a self, parent: &str, out: &mut Vec<(&'a Group, String)>) {
        if self.hidden {
            return;
        }
        let prefix = self.prefix_within(parent);
        out.push((self, prefix.clone()));
        for group in &self.groups {
            group.collect_visible(&prefix, out);
        }
    }

    /// Whether any option in the tree is shown in help output.
    pub fn has_visible_options(&self) -> bool {
        !self.hidden
            && (self.options.iter().any(|o| !o.hidden)
                || self.groups.iter().any(Group::has_visible_options))
    }

    pub(crate) fn locate(
        &self,
        parent: &str,
        matches: &dyn Fn(&OptionSpec, Option<&str>) -> bool,
    ) -> Option<OptionPath> {
        let prefix = self.prefix_within(parent);
        for (index, option) in self.options.iter().enumerate() {
            let long = option.qualified_long(&prefix);
            if matches(option, long.as_deref()) {
                return Some(OptionPath {
                    groups: Vec::new(),
                    index,
                });
            }
        }
        for (i, group) in self.groups.iter().enumerate() {
            if let Some(mut path) = group.locate(&prefix, matches) {
                path.groups.insert(0, i);
                return Some(path);
            }
        }
        None
    }

    pub(crate) fn locate_long(&self, qualified: &str) -> Option<OptionPath> {
        self.locate("", &|_, long| long == Some(qualified))
    }

    pub(crate) fn locate_short(&self, short: char) -> Option<OptionPath> {
        self.locate("", &|option, _| option.short == Some(short))
    }

    pub(crate) fn option_at(&self, path: &OptionPath) -> Option<&OptionSpec> {
        let mut group = self;
        for &i in &path.groups {
            group = group.groups.get(i)?;
        }
        group.options.get(path.index)
    }

    pub(crate) fn option_at_mut(&mut self, path: &OptionPath) -> Option<&mut OptionSpec> {
        let mut group = self;
        for &i in &path.groups {
            group = group.groups.get_mut(i)?;
        }
        group.options.get_mut(path.index)
    }

    /// Namespace prefix in effect at `path`.
    pub(crate) fn prefix_at(&self, path: &OptionPath) -> String {
        let mut prefix = self.prefix_within("");
        let mut group = self;
        for &i in &path.groups {
            match group.groups.get(i) {
                Some(child) => {
                    prefix = child.prefix_within(&prefix);
                    group = child;
                }
                None => break,
            }
        }
        prefix
    }

    pub(crate) fn for_each_option_mut(&mut self, f: &mut dyn FnMut(&mut OptionSpec)) {
        for option in &mut self.options {
            f(option);
        }
        for group in &mut self.groups {
            group.for_each_option_mut(f);
        }
    }
}
