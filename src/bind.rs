//! Left-to-right binding propagation across one constructor's fields.
//!
//! The bound set is the fold state. A field's `introduces` is merged only
//! after that field's step, which in generated code is only reached once its
//! witness has succeeded; a failing witness ends the scan.
use crate::classify::{BoundSet, Classification, Classifier};
use crate::descriptor::{ConstructorDescriptor, Shape};
use crate::error::DeriveError;
use crate::ir::{ConstructorPlan, FieldStep};

pub fn propagate(
    classifier: &Classifier,
    type_name: &str,
    index: usize,
    ctor: &ConstructorDescriptor,
    initial: &BoundSet,
) -> Result<ConstructorPlan, DeriveError> {
    let labels = match &ctor.shape {
        Shape::Labeled { labels } => Some(labels),
        _ => None,
    };

    let (fields, bound_after) = ctor.fields.iter().enumerate().try_fold(
        (Vec::with_capacity(ctor.arity()), initial.clone()),
        |(mut steps, bound), (position, ty)| {
            let classification = classifier.classify(ty, &bound).map_err(|reason| {
                DeriveError::UnsupportedFieldShape {
                    type_name: type_name.to_string(),
                    constructor: ctor.name.clone(),
                    position,
                    field: ty.to_string(),
                    reason: reason.0,
                }
            })?;
            tracing::trace!(
                type_name,
                constructor = %ctor.name,
                position,
                field = %ty,
                ?classification,
                "classified field"
            );
            let next = match &classification {
                Classification::Indexed { introduces } => bound.union(introduces).cloned().collect(),
                _ => bound.clone(),
            };
            steps.push(FieldStep {
                position,
                ty: ty.clone(),
                label: labels.and_then(|ls| ls.get(position).cloned()),
                bound_before: bound,
                classification,
            });
            Ok::<_, DeriveError>((steps, next))
        },
    )?;

    Ok(ConstructorPlan {
        index,
        name: ctor.name.clone(),
        shape: ctor.shape.clone(),
        fields,
        bound_after,
    })
}
