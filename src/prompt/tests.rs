use super::*;

#[test]
fn prompt_layout() {
    let prompt = PromptBuilder::new()
        .with_system_instruction("SYSTEM")
        .build("Je vais à le parc.", "rule\nhistory")
        .expect("should build");

    assert_eq!(
        prompt,
        "<|system|>\nSYSTEM\n</s>\n<|user|>\nContext: rule\nhistory\nSentence: Je vais à le parc.\n</s>\n<|assistant|>\n"
    );
}

#[test]
fn default_instruction_requests_json() {
    let prompt = PromptBuilder::default()
        .build("Bonjour.", "ctx")
        .expect("should build");

    assert!(prompt.starts_with("<|system|>\nYou are an expert French language tutor."));
    assert!(prompt.contains("\"correction\""));
    assert!(prompt.contains("Sentence appears correct."));
    assert!(prompt.ends_with("<|assistant|>\n"));
}

#[test]
fn build_is_deterministic() {
    let builder = PromptBuilder::new();
    assert_eq!(
        builder.build("a", "b").expect("should build"),
        builder.build("a", "b").expect("should build")
    );
}

#[test]
fn empty_context_is_allowed() {
    let prompt = PromptBuilder::new()
        .build("Bonjour.", "")
        .expect("should build");
    assert!(prompt.contains("Context: \nSentence: Bonjour."));
}

#[test]
fn empty_sentence_is_rejected() {
    let builder = PromptBuilder::new();
    assert_eq!(builder.build("", "ctx"), Err(PromptError::EmptySentence));
    assert_eq!(builder.build(" \t\n", "ctx"), Err(PromptError::EmptySentence));
}
