bitflags! {
  /// Header flags. Several bits were reused across engine branches, the
  /// deprecated meanings share the value of the current one.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
  pub struct TextureFlags: u32 {
    const POINT_SAMPLE = 0x0000_0001;
    const TRILINEAR = 0x0000_0002;
    const CLAMP_S = 0x0000_0004;
    const CLAMP_T = 0x0000_0008;
    const ANISOTROPIC = 0x0000_0010;
    const HINT_DXT5 = 0x0000_0020;
    const SRGB = 0x0000_0040;
    const NORMAL = 0x0000_0080;
    const NO_MIP = 0x0000_0100;
    const NO_LOD = 0x0000_0200;
    const MIN_MIP = 0x0000_0400;
    const PROCEDURAL = 0x0000_0800;
    const ONE_BIT_ALPHA = 0x0000_1000;
    const EIGHT_BIT_ALPHA = 0x0000_2000;
    const ENVMAP = 0x0000_4000;
    const RENDER_TARGET = 0x0000_8000;
    const DEPTH_RENDER_TARGET = 0x0001_0000;
    const NO_DEBUG_OVERRIDE = 0x0002_0000;
    const SINGLE_COPY = 0x0004_0000;
    const ONE_OVER_MIP_LEVEL_IN_ALPHA = 0x0008_0000;
    const PREMULT_COLOR_BY_ONE_OVER_MIP_LEVEL = 0x0010_0000;
    const NORMAL_TO_DUDV = 0x0020_0000;
    const ALPHA_TEST_MIP_GENERATION = 0x0040_0000;
    const NO_DEPTH_BUFFER = 0x0080_0000;
    const NICE_FILTERED = 0x0100_0000;
    const CLAMP_U = 0x0200_0000;
    const VERTEX_TEXTURE = 0x0400_0000;
    const SSBUMP = 0x0800_0000;
    const UNFILTERABLE_OK = 0x1000_0000;
    const BORDER = 0x2000_0000;
    const SPECVAR_RED = 0x4000_0000;
    const SPECVAR_ALPHA = 0x8000_0000;
  }
}

impl TextureFlags {
  /// The `DEPRECATED_NOCOMPRESS` alias of `SRGB`.
  pub const NO_COMPRESS: TextureFlags = TextureFlags::SRGB;

  /// Flags the create pipeline derives from the image contents and replaces.
  pub(crate) const DERIVED: TextureFlags = TextureFlags::ONE_BIT_ALPHA
    .union(TextureFlags::EIGHT_BIT_ALPHA)
    .union(TextureFlags::ENVMAP);
}
