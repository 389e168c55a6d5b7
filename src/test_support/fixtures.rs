//! Fixture trees for common test scenarios.

use std::fs;
use std::path::Path;

/// Library names the seven FFmpeg modules link as.
pub const MODULES: [&str; 7] = [
    "avcodec",
    "avdevice",
    "avfilter",
    "avformat",
    "avutil",
    "swresample",
    "swscale",
];

/// A trimmed Visual Studio project file referencing debug-suffixed imports.
pub const VCXPROJ_FIXTURE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project DefaultTargets="Build" ToolsVersion="14.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='DebugDLL|x64'">
    <Link>
      <AdditionalDependencies>bz2d.lib;iconvd.lib;zlibd.lib;opusd.lib;speexd.lib;theorad.lib;vorbisd.lib;xml2d.lib;fontconfigd.lib;fribidid.lib;%(AdditionalDependencies)</AdditionalDependencies>
    </Link>
  </ItemDefinitionGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='ReleaseDLL|x64'">
    <Link>
      <AdditionalDependencies>bz2.lib;iconv.lib;zlib.lib;opus.lib;libspeex.lib;%(AdditionalDependencies)</AdditionalDependencies>
    </Link>
  </ItemDefinitionGroup>
</Project>
"#;

/// Write an `SMP/` project directory under `source_root`.
pub fn write_smp_tree(source_root: &Path) {
    let smp = source_root.join("SMP");
    fs::create_dir_all(&smp).unwrap();
    fs::write(smp.join("ffmpeg.sln"), "Microsoft Visual Studio Solution File\n").unwrap();
    for project in ["libavcodec", "libavformat", "libavfilter"] {
        fs::write(smp.join(format!("{}.vcxproj", project)), VCXPROJ_FIXTURE).unwrap();
    }
    fs::write(source_root.join("COPYING.LGPLv2.1"), "GNU LESSER GENERAL PUBLIC LICENSE\n").unwrap();
}

/// Write a toolchain output tree with libraries for each of `platforms`.
pub fn write_msvc_output(output_dir: &Path, platforms: &[&str]) {
    for module in MODULES {
        let header_dir = output_dir.join("include").join(format!("lib{}", module));
        fs::create_dir_all(&header_dir).unwrap();
        fs::write(header_dir.join(format!("{}.h", module)), format!("/* {} */\n", module)).unwrap();
    }

    for platform in platforms {
        let lib_dir = output_dir.join("lib").join(platform);
        let bin_dir = output_dir.join("bin").join(platform);
        fs::create_dir_all(&lib_dir).unwrap();
        fs::create_dir_all(&bin_dir).unwrap();
        for module in MODULES {
            fs::write(lib_dir.join(format!("{}.lib", module)), module).unwrap();
            fs::write(bin_dir.join(format!("{}.dll", module)), module).unwrap();
        }
    }

    let licenses = output_dir.join("licenses");
    fs::create_dir_all(&licenses).unwrap();
    fs::write(licenses.join("ffmpeg.txt"), "LGPL-2.1\n").unwrap();
}
