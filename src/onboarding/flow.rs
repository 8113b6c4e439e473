//! Step flow controller: advancement and the fixed prompt table.
//!
//! Everything here is a pure lookup keyed by step. Text is bilingual; French
//! is used only when the draft says so.

use super::draft::{Language, ProfileDraft};
use super::step::Step;

/// Decide the next step after a turn.
///
/// No data → stay (clarification path). Data → the successor, which is
/// `Complete` for the last step. `Complete` never moves.
pub fn advance(step: Step, extraction_has_data: bool) -> Step {
    let next = step.next();
    if extraction_has_data && step.can_transition_to(next) {
        next
    } else {
        step
    }
}

fn is_french(draft: &ProfileDraft) -> bool {
    draft.language == Some(Language::Fr)
}

/// Re-ask text for a step where nothing could be extracted.
pub fn clarification_prompt(step: Step, draft: &ProfileDraft) -> String {
    let fr = is_french(draft);
    let text = match (step, fr) {
        (Step::Greeting, false) => "Just say hi when you're ready, and tell me if you'd rather chat in English or French.",
        (Step::Greeting, true) => "Dis-moi simplement bonjour quand tu es prêt, en français ou en anglais.",
        (Step::Region, false) => "I didn't catch where you're based. Are you in France, the UK, or the US?",
        (Step::Region, true) => "Je n'ai pas compris où tu vis. France, Royaume-Uni ou États-Unis ?",
        (Step::Name, false) => "Sorry, what should I call you?",
        (Step::Name, true) => "Pardon, comment dois-je t'appeler ?",
        (Step::Studies, false) => "What are you studying? Something like \"Master in computer science\" works.",
        (Step::Studies, true) => "Qu'est-ce que tu étudies ? Par exemple « Master en informatique ».",
        (Step::Skills, false) => "Which skills could you earn money with? A short list is fine, or say \"none\".",
        (Step::Skills, true) => "Quelles compétences pourrais-tu monnayer ? Une liste courte suffit, ou « aucune ».",
        (Step::Certifications, false) => "Any certifications (first aid, TOEIC, lifeguard...)? Say \"none\" if not.",
        (Step::Certifications, true) => "Des certifications (PSC1, TOEIC, BAFA...) ? Réponds « aucune » sinon.",
        (Step::Location, false) => "Which city do you live in?",
        (Step::Location, true) => "Dans quelle ville habites-tu ?",
        (Step::Budget, false) => "Roughly how much do you get and spend each month? For example \"I earn 800 and spend 600\".",
        (Step::Budget, true) => "Combien gagnes-tu et dépenses-tu par mois environ ? Par exemple « je gagne 800 et dépense 600 ».",
        (Step::WorkPreferences, false) => "How many hours a week could you work, and what's your minimum hourly rate?",
        (Step::WorkPreferences, true) => "Combien d'heures par semaine pourrais-tu travailler, et à quel taux horaire minimum ?",
        (Step::Goal, false) => "What are you saving for, and how much do you need?",
        (Step::Goal, true) => "Pour quoi veux-tu épargner, et combien te faut-il ?",
        (Step::AcademicEvents, false) => "Any exams or busy periods coming up? List them, or say \"none\".",
        (Step::AcademicEvents, true) => "Des examens ou périodes chargées à venir ? Liste-les, ou réponds « aucun ».",
        (Step::Inventory, false) => "Anything you own that you could sell? List items, or say \"nothing\".",
        (Step::Inventory, true) => "As-tu des objets que tu pourrais vendre ? Liste-les, ou réponds « rien ».",
        (Step::Trade, false) => "Anything you could swap or borrow instead of buying? Or say \"none\".",
        (Step::Trade, true) => "Des choses que tu pourrais échanger ou emprunter ? Sinon réponds « aucune ».",
        (Step::Lifestyle, false) => "Which subscriptions do you pay for (streaming, gym, phone...)? Or say \"none\".",
        (Step::Lifestyle, true) => "Quels abonnements paies-tu (streaming, salle de sport, forfait...) ? Sinon « aucun ».",
        (Step::Complete, false) => "We're all set. Ask me anything about your budget.",
        (Step::Complete, true) => "C'est tout bon. Pose-moi tes questions sur ton budget.",
    };
    text.to_string()
}

/// The question that collects `step`'s data.
pub fn question_for(step: Step, draft: &ProfileDraft) -> String {
    let fr = is_french(draft);
    let text = match (step, fr) {
        (Step::Greeting, false) => "Hi! I'm your budget coach. Ready to set things up?",
        (Step::Greeting, true) => "Salut ! Je suis ton coach budget. On commence ?",
        (Step::Region, false) => "Where are you based: France, the UK, or the US?",
        (Step::Region, true) => "Tu vis où : France, Royaume-Uni ou États-Unis ?",
        (Step::Name, false) => "What's your name?",
        (Step::Name, true) => "Comment tu t'appelles ?",
        (Step::Studies, false) => "What are you studying?",
        (Step::Studies, true) => "Qu'est-ce que tu étudies ?",
        (Step::Skills, false) => "What skills do you have that someone might pay for?",
        (Step::Skills, true) => "Quelles compétences as-tu qu'on pourrait te payer ?",
        (Step::Certifications, false) => "Do you hold any certifications?",
        (Step::Certifications, true) => "As-tu des certifications ?",
        (Step::Location, false) => "Which city do you live in?",
        (Step::Location, true) => "Dans quelle ville habites-tu ?",
        (Step::Budget, false) => "How much money comes in each month, and how much goes out?",
        (Step::Budget, true) => "Combien d'argent rentre chaque mois, et combien en sort ?",
        (Step::WorkPreferences, false) => "How many hours a week can you work, and for what minimum hourly rate?",
        (Step::WorkPreferences, true) => "Combien d'heures par semaine peux-tu travailler, et à quel taux minimum ?",
        (Step::Goal, false) => "What are you saving for? Give me an amount and a deadline if you have one.",
        (Step::Goal, true) => "Pour quoi épargnes-tu ? Donne-moi un montant et une échéance si tu en as une.",
        (Step::AcademicEvents, false) => "Any exams, internships or busy weeks coming up?",
        (Step::AcademicEvents, true) => "Des examens, stages ou semaines chargées à venir ?",
        (Step::Inventory, false) => "Is there anything you own and could sell?",
        (Step::Inventory, true) => "Y a-t-il des choses que tu pourrais vendre ?",
        (Step::Trade, false) => "Anything you could trade, borrow or share instead of buying?",
        (Step::Trade, true) => "Des choses que tu pourrais échanger, emprunter ou partager ?",
        (Step::Lifestyle, false) => "Last one: which subscriptions do you pay for?",
        (Step::Lifestyle, true) => "Dernière question : quels abonnements paies-tu ?",
        (Step::Complete, false) => "Your profile is ready. Ask me anything, or tell me what to change.",
        (Step::Complete, true) => "Ton profil est prêt. Pose-moi tes questions, ou dis-moi quoi modifier.",
    };
    text.to_string()
}

/// Acknowledge the collected data, then ask the question for `next_step`.
pub fn advance_message(next_step: Step, draft: &ProfileDraft) -> String {
    let question = question_for(next_step, draft);
    match acknowledgement(next_step, draft) {
        Some(ack) => format!("{ack} {question}"),
        None => question,
    }
}

/// Short acknowledgement of the step just before `next_step`.
fn acknowledgement(next_step: Step, draft: &ProfileDraft) -> Option<String> {
    let fr = is_french(draft);
    let symbol = draft.currency_symbol();
    match next_step {
        Step::Studies => draft.name.as_ref().map(|name| {
            if fr {
                format!("Enchanté, {name} !")
            } else {
                format!("Nice to meet you, {name}!")
            }
        }),
        Step::Budget => draft.city.as_ref().map(|city| {
            if fr {
                format!("{city}, noté.")
            } else {
                format!("{city}, got it.")
            }
        }),
        Step::WorkPreferences => match (draft.income, draft.expenses) {
            (Some(income), Some(expenses)) => Some(if fr {
                format!("Reste mensuel : {}{symbol}.", (income - expenses).normalize())
            } else {
                format!("That leaves {symbol}{} a month.", (income - expenses).normalize())
            }),
            _ => None,
        },
        Step::AcademicEvents => draft.goal_name.as_ref().map(|goal| {
            if fr {
                format!("Objectif « {goal} » enregistré.")
            } else {
                format!("Goal \"{goal}\" saved.")
            }
        }),
        Step::Complete => Some(if fr { "Merci !" } else { "Thanks!" }.to_string()),
        _ => None,
    }
}

/// Opening line for a new dialogue.
pub fn welcome() -> String {
    question_for(Step::Greeting, &ProfileDraft::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn advance_stays_without_data() {
        for step in Step::ALL {
            assert_eq!(advance(step, false), step);
        }
    }

    #[test]
    fn advance_never_skips() {
        for step in Step::ALL {
            let next = advance(step, true);
            assert!(next == step.next(), "{step} -> {next}");
            assert!(next.index() <= step.index() + 1);
        }
        assert_eq!(advance(Step::Lifestyle, true), Step::Complete);
        assert_eq!(advance(Step::Complete, true), Step::Complete);
    }

    #[test]
    fn advance_message_acknowledges_name() {
        let draft = ProfileDraft {
            name: Some("Alice".into()),
            ..Default::default()
        };
        let msg = advance_message(Step::Studies, &draft);
        assert!(msg.starts_with("Nice to meet you, Alice!"));
        assert!(msg.ends_with("What are you studying?"));
    }

    #[test]
    fn advance_message_reports_margin_in_currency() {
        let draft = ProfileDraft {
            income: Some(dec!(800)),
            expenses: Some(dec!(600)),
            currency: Some(crate::onboarding::Currency::Gbp),
            ..Default::default()
        };
        let msg = advance_message(Step::WorkPreferences, &draft);
        assert!(msg.contains("£200"), "{msg}");
    }

    #[test]
    fn french_prompts_follow_language() {
        let draft = ProfileDraft {
            language: Some(Language::Fr),
            ..Default::default()
        };
        assert!(clarification_prompt(Step::Location, &draft).contains("ville"));
        assert!(clarification_prompt(Step::Location, &ProfileDraft::default()).contains("city"));
    }

    #[test]
    fn prompts_are_never_empty() {
        let draft = ProfileDraft::default();
        for step in Step::ALL {
            assert!(!clarification_prompt(step, &draft).is_empty());
            assert!(!advance_message(step, &draft).is_empty());
        }
    }
}
