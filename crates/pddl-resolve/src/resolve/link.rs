//! Linking a domain and a problem into one model.

use pddl_ast::model::ContentKind;
use pddl_ast::{
    Category, CompileError, ConstraintExp, Diagnostics, ErrorKind, Metric, PddlObject, Phase,
};
use std::sync::Arc;
use tracing::debug;

/// Link `problem` against `domain`.
///
/// Returns `None` when linking reported an error. Diagnostics are recorded
/// in the linker phase against the problem file.
pub fn link(
    domain: &PddlObject,
    problem: &PddlObject,
    diagnostics: &mut Diagnostics,
) -> Option<PddlObject> {
    let saved_phase = diagnostics.phase();
    let saved_file = diagnostics.file().to_string();
    diagnostics.set_phase(Phase::Linker);
    diagnostics.set_file(problem.file.clone());
    let before = diagnostics.count(Category::LINKER_ERROR);

    let linked = merge(domain, problem, diagnostics);

    let failed = diagnostics.count(Category::LINKER_ERROR) > before;
    diagnostics.set_phase(saved_phase);
    diagnostics.set_file(saved_file);
    if failed {
        debug!(problem = %problem.name, "link failed");
        return None;
    }
    Some(linked)
}

fn merge(domain: &PddlObject, problem: &PddlObject, diagnostics: &mut Diagnostics) -> PddlObject {
    if problem.domain_name != domain.name {
        diagnostics.error(
            ErrorKind::UndefinedName,
            problem.span,
            format!(
                "problem '{}' is for domain '{}', not '{}'",
                problem.name, problem.domain_name, domain.name
            ),
        );
    }
    if problem.explicit_requirements && problem.requirements != domain.requirements {
        let extra: Vec<&str> = problem
            .requirements
            .iter()
            .filter(|r| !domain.requirements.contains(*r))
            .map(|r| r.key())
            .collect();
        diagnostics.warning(
            ErrorKind::RequirementMismatch,
            problem.span,
            format!(
                "problem requirements differ from the domain's (extra: {})",
                extra.join(" ")
            ),
        );
    }

    let mut linked = problem.clone();
    linked.content = ContentKind::FullProblem;
    linked.actions = Arc::clone(&domain.actions);

    let mut constants = domain.constants.clone();
    for (name, decl) in &problem.constants {
        if let Some(first) = constants.get(name) {
            let error = CompileError::new(
                ErrorKind::DuplicateName,
                decl.span,
                format!("object '{name}' is already declared as a domain constant"),
            )
            .in_phase(Phase::Linker)
            .in_file(decl.file.clone())
            .with_label(first.span, "first declared here".to_string())
            .with_note(format!("the constant is declared in {}", first.file));
            diagnostics.push(error);
            continue;
        }
        constants.insert(name.clone(), decl.clone());
    }
    linked.constants = constants;

    linked.constraints = ConstraintExp::conjoin([
        domain.constraints.clone(),
        problem.constraints.clone(),
    ]);
    if linked.metric.is_none() {
        linked.metric = Some(Metric::default());
    }
    let mut preferences = domain.preferences.clone();
    preferences.merge(&problem.preferences);
    linked.preferences = preferences;

    linked.preprocess();
    debug!(
        problem = %linked.name,
        constants = linked.constants.len(),
        actions = linked.actions.len(),
        preferences = linked.preferences.len(),
        "linked"
    );
    linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pddl_ast::model::ConstantDecl;
    use pddl_ast::{Constant, Requirement, Span, TypeSetId};

    fn decl(name: &str, file: &str, line: u32) -> ConstantDecl {
        ConstantDecl {
            constant: Constant::new(name, TypeSetId::OBJECT),
            span: Span::at(line, 1),
            file: file.to_string(),
        }
    }

    #[test]
    fn test_link_marks_full_problem_and_defaults_metric() {
        let domain = PddlObject::domain("d", "d.pddl");
        let problem = PddlObject::problem("p", "p.pddl", &domain);
        let mut diagnostics = Diagnostics::new();

        let linked = link(&domain, &problem, &mut diagnostics).unwrap();
        assert_eq!(linked.content, ContentKind::FullProblem);
        assert_eq!(linked.metric, Some(Metric::default()));
        assert!(diagnostics.is_empty());
        assert_eq!(diagnostics.phase(), Phase::Parser);
    }

    #[test]
    fn test_domain_name_mismatch() {
        let domain = PddlObject::domain("d", "d.pddl");
        let mut problem = PddlObject::problem("p", "p.pddl", &domain);
        problem.domain_name = "other".to_string();
        let mut diagnostics = Diagnostics::new();

        assert!(link(&domain, &problem, &mut diagnostics).is_none());
        assert_eq!(diagnostics.count(Category::LINKER_ERROR), 1);
    }

    #[test]
    fn test_constant_collision_points_at_both_files() {
        let mut domain = PddlObject::domain("d", "d.pddl");
        domain.constants.insert("a".into(), decl("a", "d.pddl", 4));
        let mut problem = PddlObject::problem("p", "p.pddl", &domain);
        problem.constants.insert("a".into(), decl("a", "p.pddl", 9));
        let mut diagnostics = Diagnostics::new();

        assert!(link(&domain, &problem, &mut diagnostics).is_none());
        let error = diagnostics.errors().next().unwrap();
        assert_eq!(error.kind, ErrorKind::DuplicateName);
        assert_eq!(error.file, "p.pddl");
        assert_eq!(error.span.line, 9);
        assert_eq!(error.labels[0].span.line, 4);
        assert!(error.notes[0].contains("d.pddl"));
    }

    #[test]
    fn test_extra_problem_requirement_warns() {
        let domain = PddlObject::domain("d", "d.pddl");
        let mut problem = PddlObject::problem("p", "p.pddl", &domain);
        problem.requirements.add(Requirement::Typing);
        problem.explicit_requirements = true;
        let mut diagnostics = Diagnostics::new();

        assert!(link(&domain, &problem, &mut diagnostics).is_some());
        assert_eq!(diagnostics.count(Category::LINKER_WARNING), 1);
        assert!(diagnostics.warnings().next().unwrap().message.contains(":typing"));
    }
}
