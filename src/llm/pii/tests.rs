use super::*;

#[test]
fn email_is_masked() {
	let (out, modified) =
		regex_transform("email", "contact me at jane.doe@example.com please", EMAIL.as_ref(), RuleAction::Mask)
			.unwrap();
	assert!(modified);
	assert_eq!(out, "contact me at <EMAIL_ADDRESS> please");
}

#[test]
fn ssn_is_masked() {
	let (out, modified) =
		regex_transform("ssn", "my ssn is 123-45-6789 ok", SSN.as_ref(), RuleAction::Mask).unwrap();
	assert!(modified);
	assert_eq!(out, "my ssn is <SSN> ok");
}

#[test]
fn credit_card_is_masked() {
	let (out, modified) = regex_transform(
		"cc",
		"card number 4111 2222 3333 4444 thanks",
		CC.as_ref(),
		RuleAction::Mask,
	)
	.unwrap();
	assert!(modified);
	assert_eq!(out, "card number <CREDIT_CARD> thanks");
}

#[test]
fn phone_is_masked() {
	let (out, modified) = regex_transform(
		"phone",
		"call me at +1 650-253-0000 today",
		PHONE.as_ref(),
		RuleAction::Mask,
	)
	.unwrap();
	assert!(modified);
	assert!(out.contains("<PHONE_NUMBER>"));
}

#[test]
fn no_match_is_not_modified() {
	let (out, modified) =
		regex_transform("email", "nothing sensitive here", EMAIL.as_ref(), RuleAction::Mask).unwrap();
	assert!(!modified);
	assert_eq!(out, "nothing sensitive here");
}

#[test]
fn reject_action_propagates() {
	let err = regex_transform("ssn", "ssn 123-45-6789", SSN.as_ref(), RuleAction::Reject).unwrap_err();
	assert_eq!(err.entity_type, "SSN");
}

#[test]
fn overlapping_matches_keep_highest_score() {
	// "123456789" alone matches both the very-weak 9-digit rule and, with
	// dashes, the medium-confidence rule; only the 9-digit form is present
	// here so only that rule should fire, producing a single replacement.
	let (out, modified) = regex_transform("ssn", "id 123456789 end", SSN.as_ref(), RuleAction::Mask).unwrap();
	assert!(modified);
	assert_eq!(out, "id <SSN> end");
}
