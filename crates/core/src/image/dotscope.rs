use dotscope::CilObject;

use crate::image::{
    FieldConstant, ImageError, ImageMetadata, ImageReader, ResourceEntry, ResourceKind,
};
use crate::model::AssemblyVersion;

/// Table id of `TypeDef` tokens; the registry also holds references and primitives.
const TYPE_DEF_TABLE: u8 = 0x02;

/// Reader backed by the `dotscope` ECMA-335 metadata library.
///
/// The PE container is checked with goblin first so non-.NET executables fail with a
/// clear message instead of a metadata parse error.
pub struct DotscopeReader;

impl ImageReader for DotscopeReader {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn ImageMetadata>, ImageError> {
        ensure_clr_container(bytes)?;
        let object = CilObject::from_mem(bytes.to_vec())
            .map_err(|e| ImageError::Malformed(format!("dotscope: {e}")))?;
        Ok(Box::new(DotscopeImage::load(&object)?))
    }

    fn name(&self) -> &'static str {
        "dotscope"
    }
}

fn ensure_clr_container(bytes: &[u8]) -> Result<(), ImageError> {
    let pe = goblin::pe::PE::parse(bytes)
        .map_err(|e| ImageError::Malformed(format!("not a PE image: {e}")))?;
    let has_clr_header = pe
        .header
        .optional_header
        .as_ref()
        .map(|oh| oh.data_directories.get_clr_runtime_header().is_some())
        .unwrap_or(false);
    if !has_clr_header {
        return Err(ImageError::Malformed("PE image has no CLR runtime header".into()));
    }
    Ok(())
}

struct TypeInfo {
    full_name: String,
    method_tokens: Vec<u32>,
    constants: Vec<(String, Option<i64>)>,
}

/// Owned snapshot of the metadata facts we need; the dotscope object is dropped
/// once this is built.
struct DotscopeImage {
    assembly_name: String,
    version: AssemblyVersion,
    entry_point_token: u32,
    types: Vec<TypeInfo>,
    resources: Vec<ResourceEntry>,
    references: Vec<String>,
}

impl DotscopeImage {
    fn load(object: &CilObject) -> Result<Self, ImageError> {
        let assembly = object
            .assembly()
            .ok_or_else(|| ImageError::Malformed("image has no assembly manifest".into()))?;
        let version = AssemblyVersion::new(
            assembly.major_version.into(),
            assembly.minor_version.into(),
            assembly.build_number.into(),
            assembly.revision_number.into(),
        );

        let types = object
            .types()
            .all_types()
            .iter()
            .filter(|ty| ty.token.table() == TYPE_DEF_TABLE)
            .map(|ty| TypeInfo {
                full_name: full_name(&ty.namespace, &ty.name),
                method_tokens: ty
                    .methods
                    .iter()
                    .filter_map(|(_, m)| m.token().map(|t| t.value()))
                    .collect(),
                constants: ty
                    .fields
                    .iter()
                    .map(|(_, f)| (f.name.clone(), f.default.get().and_then(|c| c.as_i64())))
                    .collect(),
            })
            .collect();

        let manifest = object.resources();
        let resources = manifest
            .iter()
            .map(|entry| {
                let resource = entry.value();
                if resource.source.is_some() {
                    return ResourceEntry {
                        name: resource.name.clone(),
                        kind: ResourceKind::Linked,
                        data: None,
                    };
                }
                ResourceEntry {
                    name: resource.name.clone(),
                    kind: ResourceKind::Embedded,
                    data: manifest.get_data(resource).map(strip_length_prefix),
                }
            })
            .collect();

        let references =
            object.refs_assembly().iter().map(|entry| entry.value().name.clone()).collect();

        Ok(Self {
            assembly_name: assembly.name.clone(),
            version,
            entry_point_token: object.cor20header().entry_point_token,
            types,
            resources,
            references,
        })
    }
}

fn full_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Embedded resource blobs are stored as a u32 length followed by the payload and
/// alignment padding. Slices that do not start with a plausible length are returned as is.
fn strip_length_prefix(data: &[u8]) -> Vec<u8> {
    let Some((prefix, rest)) = data.split_first_chunk::<4>() else {
        return data.to_vec();
    };
    let declared = u32::from_le_bytes(*prefix) as usize;
    match rest.get(..declared) {
        Some(payload) => payload.to_vec(),
        None => data.to_vec(),
    }
}

impl ImageMetadata for DotscopeImage {
    fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    fn entry_point_type(&self) -> Result<String, ImageError> {
        if self.entry_point_token == 0 {
            return Err(ImageError::MissingEntryPoint);
        }
        self.types
            .iter()
            .find(|t| t.method_tokens.contains(&self.entry_point_token))
            .map(|t| t.full_name.clone())
            .ok_or(ImageError::MissingEntryPoint)
    }

    fn version(&self) -> AssemblyVersion {
        self.version
    }

    fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.full_name.clone()).collect()
    }

    fn field_constant(&self, type_name: &str, field: &str) -> FieldConstant {
        let Some(ty) = self.types.iter().find(|t| t.full_name == type_name) else {
            return FieldConstant::TypeMissing;
        };
        match ty.constants.iter().find(|(name, _)| name == field) {
            Some((_, Some(value))) => FieldConstant::Int(*value),
            Some((_, None)) => FieldConstant::NotInteger,
            None => FieldConstant::FieldMissing,
        }
    }

    fn resources(&self) -> Vec<ResourceEntry> {
        self.resources.clone()
    }

    fn assembly_references(&self) -> Vec<String> {
        self.references.clone()
    }
}
