//! Content models as finite automata.
//!
//! Particles are translated into an ε-NFA following the construction in
//! https://www.cogsci.ed.ac.uk/~ht/XML_Europe_2003.html (functions `t_p` and `t_t` below), which
//! is then determinized by subset construction. `<xs:all>` groups are not regular in a useful
//! sense and are matched directly instead.
//!
//! Occurrence bounds are exact. Small bounds are expanded into copies of the term. An element
//! or wildcard with a large bound becomes a single loop whose iterations the [`Matcher`] counts.
use crate::{
    error::SchemaError,
    model_group::Compositor,
    particle::{MaxOccurs, Particle, Term},
    validation::clark_name,
    ElementDeclaration, Ref, SchemaComponentTable, Wildcard,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    rc::Rc,
};

/// Occurrence bounds up to this are expanded into copies of the term.
const MAX_EXPANDED_OCCURRENCES: u64 = 16;

/// States a single content model may need, in the ε-NFA and in the DFA.
pub const MAX_STATES: usize = 50_000;

/// Nesting depth of model groups at which a group is assumed to contain itself.
const MAX_GROUP_DEPTH: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transition {
    ElementDeclaration(Ref<ElementDeclaration>),
    Wildcard(Ref<Wildcard>),
}

impl Transition {
    fn of_term(term: &Term) -> Option<Self> {
        match *term {
            Term::ElementDeclaration(element) => Some(Self::ElementDeclaration(element)),
            Term::Wildcard(wildcard) => Some(Self::Wildcard(wildcard)),
            Term::ModelGroup(_) => None,
        }
    }

    /// Whether an element with this expanded name is accepted by the transition.
    pub fn accepts(
        self,
        namespace: Option<&str>,
        local_name: &str,
        components: &SchemaComponentTable,
    ) -> bool {
        match self {
            Transition::ElementDeclaration(element) => {
                let element = element.get(components);
                element.name == local_name && element.target_namespace.as_deref() == namespace
            }
            Transition::Wildcard(wildcard) => wildcard.get(components).allows(namespace),
        }
    }

    /// Whether some element is accepted by both. A declaration does not compete with a
    /// wildcard, the declaration is preferred.
    fn competes_with(self, other: Transition, components: &SchemaComponentTable) -> bool {
        match (self, other) {
            (Transition::ElementDeclaration(a), Transition::ElementDeclaration(b)) => {
                let (a, b) = (a.get(components), b.get(components));
                a.name == b.name && a.target_namespace == b.target_namespace
            }
            (Transition::Wildcard(a), Transition::Wildcard(b)) => a
                .get(components)
                .namespace_constraint
                .overlaps(&b.get(components).namespace_constraint),
            _ => false,
        }
    }

    fn describe(self, components: &SchemaComponentTable) -> String {
        match self {
            Transition::ElementDeclaration(element) => {
                let element = element.get(components);
                format!("'{}'", clark_name(element.target_namespace.as_deref(), &element.name))
            }
            Transition::Wildcard(_) => "elements of overlapping wildcards".to_string(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum EpsilonOr<T> {
    Epsilon,
    Transition(T),
}

impl<T> EpsilonOr<T> {
    fn is_epsilon(&self) -> bool {
        matches!(self, EpsilonOr::Epsilon)
    }
}

/// An NFA transition; `counter` is set on the transitions of a counted loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Label {
    transition: Transition,
    counter: Option<usize>,
}

/// Occurrence bounds of a counted loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Bounds {
    transition: Transition,
    min: u64,
    max: Option<u64>,
}

#[derive(Debug, Copy, Clone)]
struct CountedLoop {
    bounds: Bounds,
    /// The state after at least one iteration.
    looping: u32,
}

#[derive(Default)]
struct EpsilonNfa {
    end_states: BTreeSet<u32>,
    transitions: Vec<Vec<(u32, EpsilonOr<Label>)>>,
    loops: Vec<CountedLoop>,
}

impl EpsilonNfa {
    fn create_state(&mut self) -> u32 {
        let state = self.transitions.len() as u32;
        self.transitions.push(Vec::new());
        state
    }

    fn add_transition(&mut self, from: u32, to: u32, label: Label) {
        self.transitions[from as usize].push((to, EpsilonOr::Transition(label)));
    }

    fn add_epsilon_transition(&mut self, from: u32, to: u32) {
        self.transitions[from as usize].push((to, EpsilonOr::Epsilon));
    }

    fn get_transitions(&self, state: u32) -> &[(u32, EpsilonOr<Label>)] {
        &self.transitions[state as usize]
    }
}

/// ε-closures, computed on first use.
struct EpsilonClosures<'n> {
    nfa: &'n EpsilonNfa,
    memo: Vec<Option<Rc<BTreeSet<u32>>>>,
}

impl<'n> EpsilonClosures<'n> {
    fn new(nfa: &'n EpsilonNfa) -> Self {
        Self {
            nfa,
            memo: vec![None; nfa.transitions.len()],
        }
    }

    fn of(&mut self, state: u32) -> Rc<BTreeSet<u32>> {
        if let Some(closure) = &self.memo[state as usize] {
            return Rc::clone(closure);
        }
        let mut closure = BTreeSet::from([state]);
        let mut stack = vec![state];
        while let Some(current) = stack.pop() {
            for (to, label) in self.nfa.get_transitions(current) {
                if label.is_epsilon() && closure.insert(*to) {
                    stack.push(*to);
                }
            }
        }
        let closure = Rc::new(closure);
        self.memo[state as usize] = Some(Rc::clone(&closure));
        closure
    }
}

struct Builder<'c> {
    sm: EpsilonNfa,
    components: &'c SchemaComponentTable,
    owner: &'c str,
    depth: usize,
    count_loops: bool,
}

impl Builder<'_> {
    fn too_large(&self) -> SchemaError {
        SchemaError::ContentModelTooLarge(self.owner.to_string())
    }

    fn create_state(&mut self) -> Result<u32, SchemaError> {
        if self.sm.transitions.len() >= MAX_STATES {
            return Err(self.too_large());
        }
        Ok(self.sm.create_state())
    }

    fn symbol(&mut self, transition: Transition, s: u32) -> Result<u32, SchemaError> {
        let b = self.create_state()?;
        let label = Label {
            transition,
            counter: None,
        };
        self.sm.add_transition(b, s, label);
        Ok(b)
    }

    /// Builds the states for `term` so that they end in `s`; returns the entry state.
    fn t_t(&mut self, term: &Term, s: u32) -> Result<u32, SchemaError> {
        match term {
            Term::ElementDeclaration(element) => {
                self.symbol(Transition::ElementDeclaration(*element), s)
            }
            Term::Wildcard(wildcard) => self.symbol(Transition::Wildcard(*wildcard), s),
            Term::ModelGroup(group) => {
                if self.depth >= MAX_GROUP_DEPTH {
                    return Err(SchemaError::Circular(format!("{group:?}")));
                }
                self.depth += 1;
                let group = group.get(self.components);
                let entry = match group.compositor {
                    Compositor::All => Err(SchemaError::Unsupported(
                        "all (nested inside another model group)".to_string(),
                    )),
                    Compositor::Choice => {
                        let b = self.create_state()?;
                        for particle in &group.particles {
                            let alternative = self.t_p(particle, s)?;
                            self.sm.add_epsilon_transition(b, alternative);
                        }
                        Ok(b)
                    }
                    Compositor::Sequence => {
                        let mut n = s;
                        for particle in group.particles.iter().rev() {
                            n = self.t_p(particle, n)?;
                        }
                        Ok(n)
                    }
                };
                self.depth -= 1;
                entry
            }
        }
    }

    fn t_p(&mut self, particle: &Particle, s: u32) -> Result<u32, SchemaError> {
        let min_occurs = particle.min_occurs;
        let max_occurs = match particle.max_occurs {
            MaxOccurs::Unbounded => None,
            MaxOccurs::Count(max) => Some(max),
        };

        let large = min_occurs > MAX_EXPANDED_OCCURRENCES
            || max_occurs.is_some_and(|max| max > MAX_EXPANDED_OCCURRENCES);
        if large && self.count_loops {
            if let Some(transition) = Transition::of_term(&particle.term) {
                let bounds = Bounds {
                    transition,
                    min: min_occurs,
                    max: max_occurs,
                };
                return self.counted_loop(bounds, s);
            }
        }
        // every copy of a term needs at least one state
        if min_occurs.max(max_occurs.unwrap_or(0)) > MAX_STATES as u64 {
            return Err(self.too_large());
        }

        let mut n = s;
        match max_occurs {
            None => {
                let t = self.create_state()?;
                let b = self.t_t(&particle.term, t)?;
                self.sm.add_epsilon_transition(t, b);
                self.sm.add_epsilon_transition(b, n);
                n = b;
            }
            Some(max_occurs) => {
                for _ in 0..max_occurs.saturating_sub(min_occurs) {
                    let b = self.t_t(&particle.term, n)?;
                    self.sm.add_epsilon_transition(b, s);
                    n = b;
                }
            }
        }

        for _ in 0..min_occurs {
            n = self.t_t(&particle.term, n)?;
        }

        Ok(n)
    }

    /// `entry --x--> looping --x--> looping`, leaving through `s`; the iterations are checked
    /// against `bounds` while matching.
    fn counted_loop(&mut self, bounds: Bounds, s: u32) -> Result<u32, SchemaError> {
        let label = Label {
            transition: bounds.transition,
            counter: Some(self.sm.loops.len()),
        };
        let entry = self.create_state()?;
        let looping = self.create_state()?;
        self.sm.add_transition(entry, looping, label);
        self.sm.add_transition(looping, looping, label);
        self.sm.add_epsilon_transition(looping, s);
        if bounds.min == 0 {
            self.sm.add_epsilon_transition(entry, s);
        }
        self.sm.loops.push(CountedLoop { bounds, looping });
        Ok(entry)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CounterStep {
    /// First iteration of the loop.
    Start(usize),
    /// Another iteration of the loop the matcher is in.
    Continue(usize),
}

#[derive(Debug, Copy, Clone)]
struct Edge {
    transition: Transition,
    to: u32,
    counter: Option<CounterStep>,
}

#[derive(Default)]
struct Targets {
    states: BTreeSet<u32>,
    from_entry: bool,
    from_loop: bool,
}

/// A deterministic automaton. Outgoing transitions of each state are ordered by declaration
/// order, which is the order diagnostics list expected elements in.
#[derive(Debug, Default)]
pub struct Dfa {
    start_state: u32,
    end_states: BTreeSet<u32>,
    transitions: Vec<Vec<Edge>>,
    /// The counted loop a state is inside of.
    open_counters: Vec<Option<usize>>,
    counters: Vec<Bounds>,
}

impl Dfa {
    fn create_state(&mut self) -> u32 {
        let state = self.transitions.len() as u32;
        self.transitions.push(Vec::new());
        self.open_counters.push(None);
        state
    }

    fn edges(&self, state: u32) -> &[Edge] {
        &self.transitions[state as usize]
    }

    pub fn is_end_state(&self, state: u32) -> bool {
        self.end_states.contains(&state)
    }

    /// Subset construction. `Ok(None)` when the iterations of a counted loop cannot be told apart
    /// from those of another copy of it, or from a new start of itself.
    fn from_nfa(
        nfa: &EpsilonNfa,
        start: u32,
        components: &SchemaComponentTable,
        owner: &str,
    ) -> Result<Option<Self>, SchemaError> {
        type DState = Rc<BTreeSet<u32>>;

        let loop_of_state = nfa
            .loops
            .iter()
            .enumerate()
            .map(|(counter, l)| (l.looping, counter))
            .collect::<HashMap<_, _>>();
        let mut closures = EpsilonClosures::new(nfa);
        let mut dfa = Dfa {
            counters: nfa.loops.iter().map(|l| l.bounds).collect(),
            ..Dfa::default()
        };
        let mut states_by_label = HashMap::<DState, u32>::new();

        let starting_state: DState = closures.of(start);
        dfa.start_state = dfa.create_state();
        states_by_label.insert(Rc::clone(&starting_state), dfa.start_state);
        let mut pending_states = vec![starting_state];

        while let Some(d_state) = pending_states.pop() {
            let from = states_by_label[&d_state];

            let open = d_state
                .iter()
                .filter_map(|state| loop_of_state.get(state).copied())
                .collect::<Vec<_>>();
            dfa.open_counters[from as usize] = match open.as_slice() {
                [] => None,
                [counter] => Some(*counter),
                _ => return Ok(None),
            };

            let mut out_transitions = BTreeMap::<Label, Targets>::new();
            for n_state in d_state.iter().copied() {
                for (to, label) in nfa.get_transitions(n_state) {
                    let EpsilonOr::Transition(label) = label else {
                        continue;
                    };
                    let targets = out_transitions.entry(*label).or_default();
                    targets.states.extend(closures.of(*to).iter());
                    if loop_of_state.contains_key(&n_state) {
                        targets.from_loop = true;
                    } else {
                        targets.from_entry = true;
                    }
                }
            }

            // Unique Particle Attribution
            let labels = out_transitions.keys().copied().collect::<Vec<_>>();
            for (i, a) in labels.iter().enumerate() {
                for b in &labels[i + 1..] {
                    if a.transition == b.transition {
                        return Ok(None);
                    }
                    if a.transition.competes_with(b.transition, components) {
                        return Err(SchemaError::AmbiguousContentModel {
                            owner: owner.to_string(),
                            name: a.transition.describe(components),
                        });
                    }
                }
            }

            for (label, targets) in out_transitions {
                let counter = match label.counter {
                    None => None,
                    Some(counter) => match (targets.from_entry, targets.from_loop) {
                        (true, true) => return Ok(None),
                        (false, true) => Some(CounterStep::Continue(counter)),
                        _ => Some(CounterStep::Start(counter)),
                    },
                };
                let out_state = Rc::new(targets.states);
                let to = match states_by_label.get(&out_state) {
                    Some(&to) => to,
                    None => {
                        if dfa.transitions.len() >= MAX_STATES {
                            return Err(SchemaError::ContentModelTooLarge(owner.to_string()));
                        }
                        let to = dfa.create_state();
                        states_by_label.insert(Rc::clone(&out_state), to);
                        pending_states.push(out_state);
                        to
                    }
                };
                dfa.transitions[from as usize].push(Edge {
                    transition: label.transition,
                    to,
                    counter,
                });
            }
        }

        for (state, index) in &states_by_label {
            if state.iter().any(|s| nfa.end_states.contains(s)) {
                dfa.end_states.insert(*index);
            }
        }
        Ok(Some(dfa))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllMember {
    pub transition: Transition,
    pub required: bool,
}

/// The compiled content model of one complex type with element content.
#[derive(Debug)]
pub enum ContentModel {
    Automaton(Dfa),
    All(Vec<AllMember>),
}

impl ContentModel {
    /// Compiles `particle`, the content of `owner` (used in error messages).
    pub fn build(
        particle: &Particle,
        components: &SchemaComponentTable,
        owner: &str,
    ) -> Result<Self, SchemaError> {
        if let Term::ModelGroup(group) = particle.term {
            let group = group.get(components);
            if group.compositor == Compositor::All {
                let optional_group = particle.min_occurs == 0;
                let members = group
                    .particles
                    .iter()
                    .map(|member| -> Result<AllMember, SchemaError> {
                        let transition = Transition::of_term(&member.term).ok_or_else(|| {
                            SchemaError::UnexpectedChild {
                                parent: "all".to_string(),
                                child: "group".to_string(),
                            }
                        })?;
                        Ok(AllMember {
                            transition,
                            required: member.min_occurs > 0 && !optional_group,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                for (i, a) in members.iter().enumerate() {
                    if let Some(b) = members[i + 1..]
                        .iter()
                        .find(|b| a.transition.competes_with(b.transition, components))
                    {
                        return Err(SchemaError::AmbiguousContentModel {
                            owner: owner.to_string(),
                            name: b.transition.describe(components),
                        });
                    }
                }
                return Ok(Self::All(members));
            }
        }

        for count_loops in [true, false] {
            let mut builder = Builder {
                sm: EpsilonNfa::default(),
                components,
                owner,
                depth: 0,
                count_loops,
            };
            let end = builder.create_state()?;
            builder.sm.end_states.insert(end);
            let start = builder.t_p(particle, end)?;

            if let Some(dfa) = Dfa::from_nfa(&builder.sm, start, components, owner)? {
                return Ok(Self::Automaton(dfa));
            }
            tracing::debug!(owner, "occurrence counters are ambiguous, expanding the bounds");
        }
        // Without counted loops every iteration has its own states
        Err(SchemaError::AmbiguousContentModel {
            owner: owner.to_string(),
            name: "repeated particles".to_string(),
        })
    }

    pub fn matcher(&self) -> Matcher<'_> {
        let state = match self {
            Self::Automaton(dfa) => MatcherState::Automaton {
                state: dfa.start_state,
                counts: vec![0; dfa.counters.len()],
            },
            Self::All(members) => MatcherState::All(vec![false; members.len()]),
        };
        Matcher { model: self, state }
    }
}

#[derive(Debug, Clone)]
enum MatcherState {
    Automaton { state: u32, counts: Vec<u64> },
    All(Vec<bool>),
}

/// Feeds child elements through a [`ContentModel`] one at a time.
#[derive(Debug, Clone)]
pub struct Matcher<'m> {
    model: &'m ContentModel,
    state: MatcherState,
}

impl Matcher<'_> {
    /// Consumes one child element. On failure, returns what would have been accepted instead and
    /// leaves the matcher unchanged.
    pub fn step(
        &mut self,
        namespace: Option<&str>,
        local_name: &str,
        components: &SchemaComponentTable,
    ) -> Result<Transition, Vec<Transition>> {
        match (&mut self.state, self.model) {
            (MatcherState::Automaton { state, counts }, ContentModel::Automaton(dfa)) => {
                let open = dfa.open_counters[*state as usize];
                // a loop at its maximum can only be left
                let exhausted = |edge: &Edge| match (open, edge.counter) {
                    (Some(counter), Some(CounterStep::Continue(c))) if c == counter => {
                        let max = dfa.counters[counter].max;
                        max.is_some_and(|max| counts[counter] >= max)
                    }
                    _ => false,
                };
                let edges = dfa
                    .edges(*state)
                    .iter()
                    .filter(|edge| !exhausted(edge))
                    .collect::<Vec<_>>();

                // Element declarations win over wildcards
                let matched = edges
                    .iter()
                    .filter(|e| matches!(e.transition, Transition::ElementDeclaration(_)))
                    .chain(
                        edges
                            .iter()
                            .filter(|e| matches!(e.transition, Transition::Wildcard(_))),
                    )
                    .find(|e| e.transition.accepts(namespace, local_name, components))
                    .copied()
                    .copied();
                let Some(edge) = matched else {
                    return Err(edges.iter().map(|e| e.transition).collect());
                };

                if let Some(counter) = open {
                    let bounds = dfa.counters[counter];
                    let leaving = edge.counter != Some(CounterStep::Continue(counter));
                    if leaving && counts[counter] < bounds.min {
                        return Err(vec![bounds.transition]);
                    }
                }
                match edge.counter {
                    Some(CounterStep::Start(counter)) => counts[counter] = 1,
                    Some(CounterStep::Continue(counter)) => counts[counter] += 1,
                    None => {}
                }
                *state = edge.to;
                Ok(edge.transition)
            }
            (MatcherState::All(seen), ContentModel::All(members)) => {
                let matched = members
                    .iter()
                    .enumerate()
                    .find(|(i, m)| !seen[*i] && m.transition.accepts(namespace, local_name, components));
                match matched {
                    Some((i, member)) => {
                        seen[i] = true;
                        Ok(member.transition)
                    }
                    None => Err(members
                        .iter()
                        .zip(seen.iter())
                        .filter(|(_, seen)| !**seen)
                        .map(|(m, _)| m.transition)
                        .collect()),
                }
            }
            _ => Err(Vec::new()),
        }
    }

    /// Checks that the content may end here. On failure, returns what is still expected.
    pub fn finish(&self) -> Result<(), Vec<Transition>> {
        match (&self.state, self.model) {
            (MatcherState::Automaton { state, counts }, ContentModel::Automaton(dfa)) => {
                if let Some(counter) = dfa.open_counters[*state as usize] {
                    let bounds = dfa.counters[counter];
                    if counts[counter] < bounds.min {
                        return Err(vec![bounds.transition]);
                    }
                }
                if dfa.is_end_state(*state) {
                    Ok(())
                } else {
                    Err(dfa.edges(*state).iter().map(|e| e.transition).collect())
                }
            }
            (MatcherState::All(seen), ContentModel::All(members)) => {
                let missing = members
                    .iter()
                    .zip(seen.iter())
                    .filter(|(m, seen)| m.required && !**seen)
                    .map(|(m, _)| m.transition)
                    .collect::<Vec<_>>();
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(missing)
                }
            }
            _ => Ok(()),
        }
    }
}
