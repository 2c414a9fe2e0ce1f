//! Step 1: decide which fields to touch and in what order.

use wayfinder_types::model::FieldDescriptor;

/// Hidden/file inputs are skipped unless the instruction names them directly
/// by their field name or label — an instruction that says "attach resume.pdf"
/// should still reach a `type=file` field.
fn is_addressed_by_instruction(field: &FieldDescriptor, instruction: &str) -> bool {
    let instruction = instruction.to_lowercase();
    [field.name.as_deref(), field.label.as_deref(), field.id.as_deref()]
        .into_iter()
        .flatten()
        .any(|hint| !hint.is_empty() && instruction.contains(&hint.to_lowercase()))
}

/// Orders fields required-first, dropping hidden/file inputs the instruction
/// never mentions. Order within each priority tier is stable (original order
/// preserved), since PageContext already lists fields in DOM order.
pub fn order_fields<'a>(fields: &'a [FieldDescriptor], instruction: &str) -> Vec<&'a FieldDescriptor> {
    let eligible: Vec<&FieldDescriptor> = fields
        .iter()
        .filter(|f| {
            let skippable_type = matches!(f.field_type.as_str(), "hidden" | "file");
            !skippable_type || is_addressed_by_instruction(f, instruction)
        })
        .collect();

    let mut required: Vec<&FieldDescriptor> = eligible.iter().copied().filter(|f| f.required).collect();
    let optional: Vec<&FieldDescriptor> = eligible.iter().copied().filter(|f| !f.required).collect();
    required.extend(optional);
    required
}
