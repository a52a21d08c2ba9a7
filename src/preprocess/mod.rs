//! Preprocessing & Absorption
//!
//! Turns the loaded axiom soup into the canonical internal form the tableau
//! works on: role hierarchy closure, synonym resolution, GCI absorption
//! (concept and role-domain), internalisation of every expression into the
//! DAG, and told-subsumer extraction for the classifier.
//!
//! The steps run once; afterwards the knowledge base is locked.

use crate::axiom::Axiom;
use crate::dag::Bp;
use crate::expr::{ConceptExpr, DataRange, RoleExpr};
use crate::kb::{KbStatus, KnowledgeBase};
use crate::reasoner::ReasoningError;
use crate::roles::RoleId;
use crate::tableau::{AboxInit, IndividualInit};
use std::collections::{HashMap, HashSet};

/// Everything gathered from the axiom list before internalisation
#[derive(Default)]
struct Collected {
    gcis: Vec<(ConceptExpr, ConceptExpr)>,
    domains: Vec<(RoleId, ConceptExpr)>,
    ranges: Vec<(RoleId, ConceptExpr)>,
    data_ranges: Vec<(RoleId, DataRange)>,
    fairness: Vec<ConceptExpr>,
    role_links: Vec<(usize, RoleId, usize)>,
    neg_links: Vec<(usize, RoleId, usize)>,
    same: Vec<(usize, usize)>,
    different: Vec<(usize, usize)>,
}

/// Run the whole pipeline; idempotent once the KB is preprocessed
pub fn preprocess(kb: &mut KnowledgeBase) -> Result<(), ReasoningError> {
    if kb.status != KbStatus::Loading {
        return Ok(());
    }
    let axioms = std::mem::take(&mut kb.axioms);

    register_roles(kb, &axioms)?;
    kb.roles.finalize()?;

    let mut collected = collect_concept_axioms(kb, &axioms)?;
    move_defined_tolds(kb, &mut collected.gcis);
    resolve_definition_synonyms(kb)?;

    let gcis = std::mem::take(&mut collected.gcis);
    let remainder = absorb(kb, gcis, &mut collected)?;

    internalise(kb, collected, remainder)?;
    extract_told_subsumers(kb);

    kb.status = KbStatus::Preprocessed;
    log::info!(
        "preprocessed: {} concepts, {} roles, {} individuals, {} DAG vertices, global assertion {}",
        kb.concepts.len(),
        kb.roles.len(),
        kb.individuals.len(),
        kb.dag.len(),
        if kb.gci_bp == Bp::TOP { "absorbed" } else { "present" }
    );
    Ok(())
}

//---------------------------------------------------------------------
// roles
//---------------------------------------------------------------------

/// Alias table construction plus registration of every role name the
/// axioms mention, object and data hierarchies split by declaration
fn register_roles(kb: &mut KnowledgeBase, axioms: &[Axiom]) -> Result<(), ReasoningError> {
    // equivalence and inverse axioms become aliases onto a canonical name
    for axiom in axioms {
        match axiom {
            Axiom::RoleEquivalence { roles } if roles.len() > 1 => {
                let (base, base_inv) = roles[0].resolve();
                for r in &roles[1..] {
                    let (n, inv) = r.resolve();
                    if n != base {
                        kb.role_aliases
                            .insert(n.to_string(), (base.to_string(), inv != base_inv));
                    }
                }
            }
            Axiom::InverseRole { role, inverse } => {
                let (rn, ri) = role.resolve();
                let (sn, si) = inverse.resolve();
                if sn == rn {
                    // R = R⁻ told through the inverse axiom
                    kb.role_aliases.insert(sn.to_string(), (sn.to_string(), false));
                } else {
                    kb.role_aliases
                        .insert(sn.to_string(), (rn.to_string(), !ri != si));
                }
            }
            _ => {}
        }
    }

    // declared data roles
    let mut data_names: HashSet<String> = HashSet::new();
    for axiom in axioms {
        match axiom {
            Axiom::DataRole { role } | Axiom::DataRoleRange { role, .. } => {
                data_names.insert(role.clone());
            }
            _ => {}
        }
    }
    let mut note_role = |kb: &mut KnowledgeBase, name: &str, data: bool| {
        let canonical = resolve_alias(&kb.role_aliases, name).0;
        if let Err(e) = kb.roles.add_role(&canonical, data) {
            log::warn!("role registration: {e}");
        }
    };

    for axiom in axioms {
        let mut from_expr = |kb: &mut KnowledgeBase, e: &ConceptExpr| {
            walk_roles(e, &mut |name, data| {
                let canonical = resolve_alias(&kb.role_aliases, name).0;
                let data = data || data_names.contains(name) || data_names.contains(&canonical);
                let _ = kb.roles.add_role(&canonical, data);
            });
        };
        match axiom {
            Axiom::ConceptInclusion { sub, sup } => {
                from_expr(kb, sub);
                from_expr(kb, sup);
            }
            Axiom::ConceptEquivalence { concepts } | Axiom::DisjointConcepts { concepts } => {
                for c in concepts {
                    from_expr(kb, c);
                }
            }
            Axiom::ClassAssertion { concept, .. } | Axiom::FairnessConstraint { concept } => {
                from_expr(kb, concept);
            }
            Axiom::RoleDomain { role, domain } => {
                note_role(kb, role.resolve().0, false);
                from_expr(kb, domain);
            }
            Axiom::RoleRange { role, range } => {
                note_role(kb, role.resolve().0, false);
                from_expr(kb, range);
            }
            Axiom::DataRoleRange { role, .. } | Axiom::DataRole { role } => {
                note_role(kb, role, true);
            }
            Axiom::RoleInclusion { sub, sup } => {
                note_role(
                    kb,
                    sub.resolve().0,
                    data_names.contains(sub.resolve().0),
                );
                note_role(
                    kb,
                    sup.resolve().0,
                    data_names.contains(sup.resolve().0),
                );
            }
            Axiom::RoleComposition { chain, sup } => {
                for r in chain {
                    note_role(kb, r.resolve().0, false);
                }
                note_role(kb, sup.resolve().0, false);
            }
            Axiom::RoleEquivalence { roles } | Axiom::DisjointRoles { roles } => {
                for r in roles {
                    note_role(kb, r.resolve().0, false);
                }
            }
            Axiom::InverseRole { role, inverse } => {
                note_role(kb, role.resolve().0, false);
                note_role(kb, inverse.resolve().0, false);
            }
            Axiom::FunctionalRole { role }
            | Axiom::TransitiveRole { role }
            | Axiom::ReflexiveRole { role }
            | Axiom::IrreflexiveRole { role }
            | Axiom::SymmetricRole { role } => {
                note_role(kb, role.resolve().0, false);
            }
            Axiom::RoleAssertion { role, .. } | Axiom::NegativeRoleAssertion { role, .. } => {
                note_role(kb, role.resolve().0, false);
            }
            _ => {}
        }
    }

    // self-inverse aliases are symmetry assertions
    let symmetric: Vec<RoleId> = kb
        .role_aliases
        .iter()
        .filter(|(name, (canon, _))| *name == canon)
        .filter_map(|(_, (canon, _))| kb.roles.get(canon))
        .collect();
    for id in symmetric {
        kb.roles.set_symmetric(id);
    }

    // hierarchy, characteristics, compositions
    for axiom in axioms {
        match axiom {
            Axiom::RoleInclusion { sub, sup } => {
                let sub = role_ref(kb, sub)?;
                let sup = role_ref(kb, sup)?;
                kb.roles.add_subrole(sub, sup)?;
            }
            Axiom::RoleComposition { chain, sup } => {
                let chain = chain
                    .iter()
                    .map(|r| role_ref(kb, r))
                    .collect::<Result<Vec<_>, _>>()?;
                let sup = role_ref(kb, sup)?;
                kb.roles.add_composition(chain, sup)?;
            }
            Axiom::DisjointRoles { roles } => {
                let ids = roles
                    .iter()
                    .map(|r| role_ref(kb, r))
                    .collect::<Result<Vec<_>, _>>()?;
                for (i, &a) in ids.iter().enumerate() {
                    for &b in &ids[i + 1..] {
                        kb.roles.set_disjoint(a, b);
                    }
                }
            }
            Axiom::FunctionalRole { role } => {
                let id = role_ref(kb, role)?;
                kb.roles.set_functional(id);
            }
            Axiom::TransitiveRole { role } => {
                let id = role_ref(kb, role)?;
                kb.roles.set_transitive(id);
            }
            Axiom::ReflexiveRole { role } => {
                let id = role_ref(kb, role)?;
                kb.roles.set_reflexive(id);
            }
            Axiom::IrreflexiveRole { role } => {
                let id = role_ref(kb, role)?;
                kb.roles.set_irreflexive(id);
            }
            Axiom::SymmetricRole { role } => {
                let id = role_ref(kb, role)?;
                kb.roles.set_symmetric(id);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Follow the alias table; returns the canonical name and the accumulated
/// inversion
fn resolve_alias(aliases: &HashMap<String, (String, bool)>, name: &str) -> (String, bool) {
    let mut current = name.to_string();
    let mut inverted = false;
    let mut seen = HashSet::new();
    while let Some((next, inv)) = aliases.get(&current) {
        if !seen.insert(current.clone()) || *next == current {
            break;
        }
        inverted ^= inv;
        current = next.clone();
    }
    (current, inverted)
}

/// Resolve a role expression to a registered signed id
fn role_ref(kb: &KnowledgeBase, expr: &RoleExpr) -> Result<RoleId, ReasoningError> {
    let (name, inv1) = expr.resolve();
    let (canonical, inv2) = resolve_alias(&kb.role_aliases, name);
    let id = kb
        .roles
        .get(&canonical)
        .ok_or_else(|| ReasoningError::MalformedInput {
            detail: format!("unregistered role '{name}'"),
        })?;
    Ok(if inv1 != inv2 { id.inverse() } else { id })
}

/// Same, for the plain role names concept expressions carry
fn named_role(kb: &KnowledgeBase, name: &str) -> Result<RoleId, ReasoningError> {
    role_ref(kb, &RoleExpr::name(name))
}

/// Visit every role name in a concept expression; the flag marks data use
fn walk_roles(expr: &ConceptExpr, f: &mut impl FnMut(&str, bool)) {
    match expr {
        ConceptExpr::Not(e) => walk_roles(e, f),
        ConceptExpr::And(es) | ConceptExpr::Or(es) => {
            for e in es {
                walk_roles(e, f);
            }
        }
        ConceptExpr::Exists(r, e)
        | ConceptExpr::Forall(r, e)
        | ConceptExpr::AtLeast(_, r, e)
        | ConceptExpr::AtMost(_, r, e) => {
            f(r, false);
            walk_roles(e, f);
        }
        ConceptExpr::SelfRef(r) => f(r, false),
        ConceptExpr::DataExists(r, _) | ConceptExpr::DataForall(r, _) => f(r, true),
        ConceptExpr::DataHasValue(r, _) => f(r, true),
        _ => {}
    }
}

//---------------------------------------------------------------------
// concept axioms
//---------------------------------------------------------------------

fn collect_concept_axioms(
    kb: &mut KnowledgeBase,
    axioms: &[Axiom],
) -> Result<Collected, ReasoningError> {
    let mut out = Collected::default();
    for axiom in axioms {
        match axiom {
            Axiom::ConceptInclusion { sub, sup } => {
                if let ConceptExpr::Name(a) = sub {
                    let id = kb.concept_id(a)?;
                    kb.concepts[id].told_exprs.push(sup.clone());
                } else {
                    out.gcis.push((sub.clone(), sup.clone()));
                }
            }
            Axiom::ConceptEquivalence { concepts } => {
                for other in concepts.iter().skip(1) {
                    equate(kb, &concepts[0], other, &mut out.gcis)?;
                }
            }
            Axiom::DisjointConcepts { concepts } => {
                for (i, a) in concepts.iter().enumerate() {
                    for b in &concepts[i + 1..] {
                        if let (ConceptExpr::Name(na), ConceptExpr::Name(nb)) = (a, b) {
                            let ia = kb.concept_id(na)?;
                            let ib = kb.concept_id(nb)?;
                            kb.disjoint_pairs.insert((ia.min(ib), ia.max(ib)));
                        }
                        if let ConceptExpr::Name(na) = a {
                            let id = kb.concept_id(na)?;
                            kb.concepts[id].told_exprs.push(b.clone().not());
                        } else {
                            out.gcis.push((a.clone(), b.clone().not()));
                        }
                    }
                }
            }
            Axiom::RoleDomain { role, domain } => {
                let id = role_ref(kb, role)?;
                out.domains.push((id, domain.clone()));
            }
            Axiom::RoleRange { role, range } => {
                let id = role_ref(kb, role)?;
                out.ranges.push((id, range.clone()));
            }
            Axiom::DataRoleRange { role, range } => {
                let id = named_role(kb, role)?;
                out.data_ranges.push((id, range.clone()));
            }
            Axiom::Individual { name } => {
                kb.individual_id(name)?;
            }
            Axiom::ClassAssertion {
                individual,
                concept,
            } => {
                let id = kb.individual_id(individual)?;
                kb.individuals[id].types.push(concept.clone());
            }
            Axiom::RoleAssertion {
                subject,
                role,
                object,
            } => {
                let s = kb.individual_id(subject)?;
                let o = kb.individual_id(object)?;
                let r = role_ref(kb, role)?;
                out.role_links.push((s, r, o));
            }
            Axiom::NegativeRoleAssertion {
                subject,
                role,
                object,
            } => {
                let s = kb.individual_id(subject)?;
                let o = kb.individual_id(object)?;
                let r = role_ref(kb, role)?;
                out.neg_links.push((s, r, o));
            }
            Axiom::SameIndividuals { individuals } => {
                for pair in individuals.windows(2) {
                    let a = kb.individual_id(&pair[0])?;
                    let b = kb.individual_id(&pair[1])?;
                    out.same.push((a, b));
                }
            }
            Axiom::DifferentIndividuals { individuals } => {
                for (i, a) in individuals.iter().enumerate() {
                    for b in &individuals[i + 1..] {
                        let ia = kb.individual_id(a)?;
                        let ib = kb.individual_id(b)?;
                        out.different.push((ia, ib));
                    }
                }
            }
            Axiom::FairnessConstraint { concept } => {
                out.fairness.push(concept.clone());
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Record `left = right`
fn equate(
    kb: &mut KnowledgeBase,
    left: &ConceptExpr,
    right: &ConceptExpr,
    gcis: &mut Vec<(ConceptExpr, ConceptExpr)>,
) -> Result<(), ReasoningError> {
    match (left, right) {
        (ConceptExpr::Name(a), ConceptExpr::Name(b)) => {
            let a_id = kb.concept_id(a)?;
            let ia = kb.resolve_synonym(a_id);
            let b_id = kb.concept_id(b)?;
            let ib = kb.resolve_synonym(b_id);
            if ia != ib {
                // the later entry becomes a synonym; its told facts move over
                let told = std::mem::take(&mut kb.concepts[ib].told_exprs);
                let def = kb.concepts[ib].definition_expr.take();
                kb.concepts[ib].synonym_of = Some(ia);
                kb.concepts[ia].told_exprs.extend(told);
                if kb.concepts[ia].definition_expr.is_none() {
                    kb.concepts[ia].definition_expr = def;
                    if kb.concepts[ia].definition_expr.is_some() {
                        kb.concepts[ia].primitive = false;
                    }
                }
            }
            Ok(())
        }
        (ConceptExpr::Name(a), expr) | (expr, ConceptExpr::Name(a)) => {
            let a_id = kb.concept_id(a)?;
            let id = kb.resolve_synonym(a_id);
            let c = &mut kb.concepts[id];
            if c.primitive
                && c.definition_expr.is_none()
                && kb.config.reasoning.always_prefer_equals
            {
                c.primitive = false;
                c.definition_expr = Some(expr.clone());
            } else {
                // double-sided naming is illegal: fall back to inclusions
                c.told_exprs.push(expr.clone());
                gcis.push((expr.clone(), ConceptExpr::Name(a.clone())));
            }
            Ok(())
        }
        (l, r) => {
            gcis.push((l.clone(), r.clone()));
            gcis.push((r.clone(), l.clone()));
            Ok(())
        }
    }
}

/// A defined concept with leftover told inclusions keeps only its
/// definition; the inclusions restate themselves as GCIs over it
fn move_defined_tolds(kb: &mut KnowledgeBase, gcis: &mut Vec<(ConceptExpr, ConceptExpr)>) {
    for id in 0..kb.concepts.len() {
        if kb.concepts[id].synonym_of.is_some() || kb.concepts[id].primitive {
            continue;
        }
        let told = std::mem::take(&mut kb.concepts[id].told_exprs);
        let name = ConceptExpr::Name(kb.concepts[id].name.clone());
        for t in told {
            gcis.push((name.clone(), t));
        }
    }
}

/// Definitions that reduce to a bare name are synonyms; run to fixpoint
fn resolve_definition_synonyms(kb: &mut KnowledgeBase) -> Result<(), ReasoningError> {
    loop {
        let mut changed = false;
        for id in 0..kb.concepts.len() {
            if kb.concepts[id].synonym_of.is_some() {
                continue;
            }
            let target_name = match &kb.concepts[id].definition_expr {
                Some(ConceptExpr::Name(n)) if kb.concepts[id].told_exprs.is_empty() => n.clone(),
                _ => continue,
            };
            let target_id = kb.concept_id(&target_name)?;
            let target = kb.resolve_synonym(target_id);
            if target == id {
                continue;
            }
            kb.concepts[id].definition_expr = None;
            kb.concepts[id].synonym_of = Some(target);
            changed = true;
            log::debug!("synonym: {} = {}", kb.concepts[id].name, kb.concepts[target].name);
        }
        if !changed {
            return Ok(());
        }
    }
}

//---------------------------------------------------------------------
// absorption
//---------------------------------------------------------------------

/// Flatten an implicitly negated expression into disjuncts. A `Top`
/// disjunct marks the axiom as a tautology; `Bottom` disjuncts vanish.
fn collect_disjuncts(expr: &ConceptExpr, negated: bool, out: &mut Vec<ConceptExpr>) {
    match (expr, negated) {
        (ConceptExpr::Not(e), n) => collect_disjuncts(e, !n, out),
        (ConceptExpr::Or(es), false) | (ConceptExpr::And(es), true) => {
            for e in es {
                collect_disjuncts(e, negated, out);
            }
        }
        (ConceptExpr::Top, false) | (ConceptExpr::Bottom, true) => out.push(ConceptExpr::Top),
        (ConceptExpr::Top, true) | (ConceptExpr::Bottom, false) => {}
        (e, false) => out.push(e.clone()),
        (e, true) => out.push(ConceptExpr::Not(Box::new(e.clone()))),
    }
}

fn or_of(mut disjuncts: Vec<ConceptExpr>) -> ConceptExpr {
    match disjuncts.len() {
        0 => ConceptExpr::Bottom,
        1 => disjuncts.pop().expect("checked length"),
        _ => ConceptExpr::Or(disjuncts),
    }
}

/// Absorb each GCI into a concept or a role domain where possible; the
/// rest is returned for the global assertion
fn absorb(
    kb: &mut KnowledgeBase,
    gcis: Vec<(ConceptExpr, ConceptExpr)>,
    collected: &mut Collected,
) -> Result<Vec<ConceptExpr>, ReasoningError> {
    let mut remainder = Vec::new();
    let total = gcis.len();
    for (sub, sup) in gcis {
        let mut disjuncts = Vec::new();
        collect_disjuncts(&sub, true, &mut disjuncts);
        collect_disjuncts(&sup, false, &mut disjuncts);
        if disjuncts.iter().any(|d| matches!(d, ConceptExpr::Top)) {
            continue;
        }

        // concept absorption: ¬A ⊔ F with primitive A becomes A ⊑ F
        let absorbable = disjuncts.iter().position(|d| {
            if let ConceptExpr::Not(inner) = d {
                if let ConceptExpr::Name(n) = inner.as_ref() {
                    if let Some(&id) = kb.concept_names.get(n) {
                        return kb.concepts[kb.resolve_synonym(id)].primitive;
                    }
                    return true; // fresh names register as primitive
                }
            }
            false
        });
        if let Some(pos) = absorbable {
            let name = match disjuncts.remove(pos) {
                ConceptExpr::Not(inner) => match *inner {
                    ConceptExpr::Name(n) => n,
                    _ => unreachable!("absorbable position was a negated name"),
                },
                _ => unreachable!("absorbable position was a negated name"),
            };
            let name_id = kb.concept_id(&name)?;
            let id = kb.resolve_synonym(name_id);
            kb.concepts[id].told_exprs.push(or_of(disjuncts));
            continue;
        }

        // role-domain absorption: ¬∃R.⊤ ⊔ F becomes Domain(R) ⊑ F
        let domain_pos = disjuncts.iter().position(|d| {
            matches!(d, ConceptExpr::Not(inner)
                if matches!(inner.as_ref(), ConceptExpr::Exists(_, filler)
                    if matches!(filler.as_ref(), ConceptExpr::Top)))
        });
        if let Some(pos) = domain_pos {
            let role_name = match disjuncts.remove(pos) {
                ConceptExpr::Not(inner) => match *inner {
                    ConceptExpr::Exists(r, _) => r,
                    _ => unreachable!("domain position was a negated existential"),
                },
                _ => unreachable!("domain position was a negated existential"),
            };
            let role = named_role(kb, &role_name)?;
            collected.domains.push((role, or_of(disjuncts)));
            continue;
        }

        remainder.push(or_of(disjuncts));
    }
    log::debug!(
        "absorption: {} of {} general axioms left for the global assertion",
        remainder.len(),
        total
    );
    Ok(remainder)
}

//---------------------------------------------------------------------
// internalisation
//---------------------------------------------------------------------

fn internalise(
    kb: &mut KnowledgeBase,
    collected: Collected,
    remainder: Vec<ConceptExpr>,
) -> Result<(), ReasoningError> {
    // role domains and ranges first, so the tableau sees them on every edge
    for (role, expr) in collected.domains {
        let bp = intern_concept(kb, &expr, false)?;
        kb.roles.set_domain(role, bp);
    }
    for (role, expr) in collected.ranges {
        let bp = intern_concept(kb, &expr, false)?;
        kb.roles.set_range(role, bp);
    }
    for (role, range) in collected.data_ranges {
        let bp = intern_data_range(kb, &range);
        kb.roles.set_range(role, bp);
    }

    // concept definitions
    for id in 0..kb.concepts.len() {
        if kb.concepts[id].synonym_of.is_some() {
            continue;
        }
        let pname = kb.concepts[id].pname;
        if kb.concepts[id].primitive {
            let told = kb.concepts[id].told_exprs.clone();
            if !told.is_empty() {
                kb.concepts[id].completely_defined =
                    told.iter().all(is_conjunction_of_names);
                let bps = told
                    .iter()
                    .map(|e| intern_concept(kb, e, false))
                    .collect::<Result<Vec<_>, _>>()?;
                let def = kb.dag.and(bps);
                kb.dag.set_definition(pname, def);
            }
        } else {
            let expr = kb.concepts[id]
                .definition_expr
                .clone()
                .expect("defined concept without a definition");
            let def = intern_concept(kb, &expr, false)?;
            kb.dag.set_definition(pname, def);
            kb.dag.set_primitive(pname, false);
        }
    }

    // individuals: asserted types plus negative role assertions
    for id in 0..kb.individuals.len() {
        let types = kb.individuals[id].types.clone();
        let mut bps = types
            .iter()
            .map(|e| intern_concept(kb, e, false))
            .collect::<Result<Vec<_>, _>>()?;
        for &(s, role, o) in &collected.neg_links {
            if s == id {
                let target = kb.individuals[o].pname.inverse();
                bps.push(kb.dag.forall(role, target, &kb.roles));
            }
        }
        let def = kb.dag.and(bps.clone());
        kb.dag.set_definition(kb.individuals[id].pname, def);
        kb.individuals[id].concept_bps = bps;
    }

    // what absorption could not place becomes the global assertion
    let gci_bps = remainder
        .iter()
        .map(|e| intern_concept(kb, e, false))
        .collect::<Result<Vec<_>, _>>()?;
    kb.gci_bp = kb.dag.and(gci_bps);

    kb.fairness = collected
        .fairness
        .iter()
        .map(|e| intern_concept(kb, e, false))
        .collect::<Result<Vec<_>, _>>()?;

    kb.abox = AboxInit {
        individuals: kb
            .individuals
            .iter()
            .map(|i| IndividualInit {
                name: i.name.clone(),
                pname: i.pname,
                concepts: Vec::new(), // the definition carries the types
            })
            .collect(),
        role_links: collected.role_links,
        different: collected.different,
        same: collected.same,
    };
    Ok(())
}

fn is_conjunction_of_names(expr: &ConceptExpr) -> bool {
    match expr {
        ConceptExpr::Name(_) => true,
        ConceptExpr::And(es) => es.iter().all(is_conjunction_of_names),
        _ => false,
    }
}

/// Internalise a concept expression. With `locked` set (queries after
/// preprocessing), unknown names are malformed input instead of fresh
/// registrations.
pub(crate) fn intern_concept(
    kb: &mut KnowledgeBase,
    expr: &ConceptExpr,
    locked: bool,
) -> Result<Bp, ReasoningError> {
    match expr {
        ConceptExpr::Top => Ok(Bp::TOP),
        ConceptExpr::Bottom => Ok(Bp::BOTTOM),
        ConceptExpr::Name(n) => {
            let id = match kb.concept_names.get(n) {
                Some(&id) => id,
                None if locked => {
                    return Err(ReasoningError::MalformedInput {
                        detail: format!("unregistered concept '{n}'"),
                    })
                }
                None => kb.concept_id(n)?,
            };
            Ok(kb.concepts[kb.resolve_synonym(id)].pname)
        }
        ConceptExpr::Not(e) => Ok(intern_concept(kb, e, locked)?.inverse()),
        ConceptExpr::And(es) => {
            let bps = es
                .iter()
                .map(|e| intern_concept(kb, e, locked))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(kb.dag.and(bps))
        }
        ConceptExpr::Or(es) => {
            let bps = es
                .iter()
                .map(|e| intern_concept(kb, e, locked))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(kb.dag.or(bps))
        }
        ConceptExpr::Exists(r, e) => {
            let role = object_role(kb, r)?;
            let filler = intern_concept(kb, e, locked)?;
            Ok(kb.dag.exists(role, filler, &kb.roles))
        }
        ConceptExpr::Forall(r, e) => {
            let role = object_role(kb, r)?;
            let filler = intern_concept(kb, e, locked)?;
            Ok(kb.dag.forall(role, filler, &kb.roles))
        }
        ConceptExpr::AtLeast(n, r, e) => {
            let role = simple_role(kb, r)?;
            let filler = intern_concept(kb, e, locked)?;
            Ok(kb.dag.atleast(*n, role, filler))
        }
        ConceptExpr::AtMost(n, r, e) => {
            let role = simple_role(kb, r)?;
            let filler = intern_concept(kb, e, locked)?;
            Ok(kb.dag.atmost(*n, role, filler))
        }
        ConceptExpr::SelfRef(r) => {
            let role = simple_role(kb, r)?;
            Ok(kb.dag.self_ref(role))
        }
        ConceptExpr::OneOf(names) => {
            let mut bps = Vec::with_capacity(names.len());
            for name in names {
                let id = match kb.individual_names.get(name) {
                    Some(&id) => id,
                    None if locked => {
                        return Err(ReasoningError::MalformedInput {
                            detail: format!("unregistered individual '{name}'"),
                        })
                    }
                    None => kb.individual_id(name)?,
                };
                bps.push(kb.individuals[id].pname);
            }
            Ok(kb.dag.or(bps))
        }
        ConceptExpr::DataExists(r, range) => {
            let role = data_role(kb, r)?;
            let filler = intern_data_range(kb, range);
            Ok(kb.dag.exists(role, filler, &kb.roles))
        }
        ConceptExpr::DataForall(r, range) => {
            let role = data_role(kb, r)?;
            let filler = intern_data_range(kb, range);
            Ok(kb.dag.forall(role, filler, &kb.roles))
        }
        ConceptExpr::DataHasValue(r, value) => {
            let role = data_role(kb, r)?;
            let filler = kb.dag.data_value(value.clone());
            Ok(kb.dag.exists(role, filler, &kb.roles))
        }
    }
}

fn intern_data_range(kb: &mut KnowledgeBase, range: &DataRange) -> Bp {
    match range {
        DataRange::Type(kind) => kb.dag.data_type(*kind),
        DataRange::Value(v) => kb.dag.data_value(v.clone()),
        DataRange::Not(r) => intern_data_range(kb, r).inverse(),
        DataRange::And(rs) => {
            let bps = rs.iter().map(|r| intern_data_range(kb, r)).collect();
            kb.dag.and(bps)
        }
        DataRange::Restriction(kind, facets) => {
            let mut bps = vec![kb.dag.data_type(*kind)];
            for f in facets {
                bps.push(kb.dag.data_expr(f.clone()));
            }
            kb.dag.and(bps)
        }
    }
}

fn object_role(kb: &KnowledgeBase, name: &str) -> Result<RoleId, ReasoningError> {
    let id = named_role(kb, name)?;
    if kb.roles.role(id).is_data() {
        return Err(ReasoningError::MalformedInput {
            detail: format!("data role '{name}' in an object restriction"),
        });
    }
    Ok(id)
}

fn data_role(kb: &KnowledgeBase, name: &str) -> Result<RoleId, ReasoningError> {
    let id = named_role(kb, name)?;
    if !kb.roles.role(id).is_data() {
        return Err(ReasoningError::MalformedInput {
            detail: format!("object role '{name}' in a data restriction"),
        });
    }
    Ok(id)
}

/// Cardinality and self restrictions demand simple roles; anything else
/// fails fast
fn simple_role(kb: &KnowledgeBase, name: &str) -> Result<RoleId, ReasoningError> {
    let id = object_role(kb, name)?;
    if !kb.roles.role(id).is_simple() {
        return Err(ReasoningError::MalformedInput {
            detail: format!("non-simple role '{name}' in a cardinality restriction"),
        });
    }
    Ok(id)
}

//---------------------------------------------------------------------
// told subsumers
//---------------------------------------------------------------------

/// Named concepts on the top level of a description become classification
/// hints
fn extract_told_subsumers(kb: &mut KnowledgeBase) {
    for id in 0..kb.concepts.len() {
        if kb.concepts[id].synonym_of.is_some() {
            continue;
        }
        let mut names: Vec<String> = Vec::new();
        for e in &kb.concepts[id].told_exprs {
            names.extend(e.conjunct_names().iter().map(|s| (*s).to_string()));
        }
        if let Some(def) = &kb.concepts[id].definition_expr {
            names.extend(def.conjunct_names().iter().map(|s| (*s).to_string()));
        }
        let mut subsumers = Vec::new();
        for name in names {
            if let Some(&ts) = kb.concept_names.get(&name) {
                let ts = kb.resolve_synonym(ts);
                if ts != id && !subsumers.contains(&ts) {
                    subsumers.push(ts);
                }
            }
        }
        kb.concepts[id].told_subsumers = subsumers;
    }
}
